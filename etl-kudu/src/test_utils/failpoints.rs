use fail::FailScenario;

/// Configures failpoints for the lifetime of the value and turns them off on drop.
pub struct CustomFailScenario<'a> {
    _scenario: FailScenario<'a>,
    failpoints: Vec<String>,
}

impl<'a> CustomFailScenario<'a> {
    /// Takes `(failpoint, action)` pairs, e.g. `("write_batch.before_flush", "return(timeout)")`.
    pub fn setup(failpoints: &[(&str, &str)]) -> CustomFailScenario<'a> {
        let scenario = FailScenario::setup();

        for (failpoint, action) in failpoints {
            fail::cfg(*failpoint, action).expect("failpoint action is valid");
        }

        Self {
            _scenario: scenario,
            failpoints: failpoints
                .iter()
                .map(|(failpoint, _)| failpoint.to_string())
                .collect(),
        }
    }
}

impl Drop for CustomFailScenario<'_> {
    fn drop(&mut self) {
        for failpoint in &self.failpoints {
            let _ = fail::cfg(failpoint.as_str(), "off");
        }
    }
}
