mod write_test;
