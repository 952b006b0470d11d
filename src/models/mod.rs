pub mod audit;
pub mod health;
pub mod notification;
pub mod response;
pub mod retry;
pub mod validation;
