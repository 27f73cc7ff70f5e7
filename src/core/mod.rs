pub mod dates;
pub mod reports;
pub mod signup;
pub mod volunteers;
