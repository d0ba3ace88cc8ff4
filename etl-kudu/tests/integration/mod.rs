mod sync_test;
mod template_test;
mod truncate_test;
