use crate::{
    error::NotificationResult,
    models::notification::{NotificationRequest, NotificationType},
};

pub fn validate_notification_type(notification_type: &str) -> NotificationResult<NotificationType> {
    notification_type.parse::<NotificationType>()
}

pub fn validate_request(request: &NotificationRequest) -> NotificationResult<NotificationType> {
    validate_notification_type(&request.notification_type)
}
