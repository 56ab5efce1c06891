use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::features::issues::models::{IssueCategory, IssueStatus};
use crate::shared::validation::IMAGE_FILE_REGEX;

/// Unpersisted photo attached to a report form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImageUpload {
    #[validate(regex(path = *IMAGE_FILE_REGEX, message = "Invalid image file name"))]
    pub file_name: String,

    pub bytes: Vec<u8>,
}

/// Request DTO for reporting a new issue
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportIssueDto {
    pub category: IssueCategory,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(nested)]
    pub image: Option<ImageUpload>,
}

/// Request DTO for an institution editing an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateIssueDto {
    pub status: Option<IssueStatus>,

    pub category: Option<IssueCategory>,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_report() -> ReportIssueDto {
        ReportIssueDto {
            category: IssueCategory::Damage,
            description: "Collapsed pavement".to_string(),
            latitude: 42.66,
            longitude: 21.17,
            image: None,
        }
    }

    #[test]
    fn test_valid_report_passes() {
        assert!(valid_report().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let mut dto = valid_report();
        dto.latitude = 91.0;
        assert!(dto.validate().is_err());

        let mut dto = valid_report();
        dto.longitude = -181.0;
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_empty_description_rejected() {
        let mut dto = valid_report();
        dto.description = String::new();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_bad_image_file_name_rejected() {
        let mut dto = valid_report();
        dto.image = Some(ImageUpload {
            file_name: "../escape.jpg".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert!(dto.validate().is_err());
    }
}
