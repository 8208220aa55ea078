use serde::{Deserialize, Deserializer};

// https://www.flickr.com/services/api/
//
// The JSON format wraps plain text in `{"_content": ...}` objects and reports
// paging counters sometimes as numbers and sometimes as strings.

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosetsGetListResponse {
    pub photosets: PhotosetList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosetList {
    #[serde(default, deserialize_with = "number_or_string")]
    pub pages: usize,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total: usize,
    #[serde(default)]
    pub photoset: Vec<Photoset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photoset {
    pub id: String,
    #[serde(default)]
    pub title: Content,
    #[serde(default)]
    pub description: Content,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosetsGetInfoResponse {
    pub photoset: Photoset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosetsGetPhotosResponse {
    pub photoset: PhotosetPhotos,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotosetPhotos {
    #[serde(default)]
    pub photo: Vec<PhotoEntry>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub page: usize,
    #[serde(default, deserialize_with = "number_or_string")]
    pub pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url_m: Option<String>,
    #[serde(default)]
    pub description: Content,
    #[serde(default, deserialize_with = "optional_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "optional_coordinate")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckTokenResponse {
    pub oauth: CheckTokenOAuth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckTokenOAuth {
    pub perms: Content,
    pub user: CheckTokenUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckTokenUser {
    pub nsid: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub fullname: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(number) => number
            .as_u64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid count: {number}"))),
        NumberOrString::String(value) => value
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid count: {value}"))),
    }
}

fn optional_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(number)) => Ok(number.as_f64()),
        Some(NumberOrString::String(value)) if value.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(value)) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn photoset_list_accepts_string_counters() {
        let response: PhotosetsGetListResponse = serde_json::from_value(json!({
            "photosets": {
                "page": 1,
                "pages": "2",
                "perpage": 1,
                "total": "2",
                "photoset": [{
                    "id": "72157",
                    "title": { "_content": "Vacation" },
                    "description": { "_content": "Summer trip" }
                }]
            },
            "stat": "ok"
        }))
        .unwrap();

        assert_eq!(response.photosets.pages, 2);
        assert_eq!(response.photosets.total, 2);
        assert_eq!(response.photosets.photoset[0].title.content, "Vacation");
    }

    #[test]
    fn photo_entry_reads_geo_extras_in_either_form() {
        let entry: PhotoEntry = serde_json::from_value(json!({
            "id": "1",
            "title": "IMG_0001",
            "url_m": "https://live.staticflickr.com/1/1_m.jpg",
            "description": { "_content": "" },
            "latitude": "48.858",
            "longitude": 2.294
        }))
        .unwrap();

        assert_eq!(entry.latitude, Some(48.858));
        assert_eq!(entry.longitude, Some(2.294));
        assert_eq!(entry.description.content, "");
    }

    #[test]
    fn photo_entry_without_extras_has_no_url_or_geo() {
        let entry: PhotoEntry = serde_json::from_value(json!({ "id": "2" })).unwrap();

        assert!(entry.url_m.is_none());
        assert!(entry.latitude.is_none());
        assert_eq!(entry.title, "");
    }
}
