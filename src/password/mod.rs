pub use policy::{CustomPolicy, CustomPolicyConfig, PasswordError, PasswordPolicy, PolicyMode};

mod policy;
