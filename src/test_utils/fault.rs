//! Module that contains utility functions for fault injection in test code

#[derive(Debug, Clone, Copy, Default)]
pub enum When {
    Always,
    #[default]
    Never,
}

/// A fault is an error that is returned based on the [`When`]
#[derive(Clone, Copy, Debug, Default)]
pub struct Fault {
    pub when: When,
}
