// Declarative commands: apply, diff, status, forget
pub mod declarative;
