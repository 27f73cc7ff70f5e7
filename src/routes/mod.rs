pub mod attendance;
pub mod causes;
pub mod events;
pub mod home_org;
pub mod messages;
pub mod notifications;
pub mod organizations;
pub mod reports;
pub mod signup;
pub mod users;
pub mod volunteers;
