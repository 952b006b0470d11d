pub mod broker;
pub mod channels;
pub mod database;
pub mod health;
pub mod memory;
pub mod rbmq;
