use serde::Serialize;
use serde_json::{Map, Value};

/// Flat projection of a follower, one per line of the export file.
///
/// Field order matches the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapedFollower {
    pub id_str: String,
    pub name: String,
    pub screen_name: String,
    pub description: String,
    pub statuses_count: u64,
    pub followers_count: u64,
    pub friends_count: u64,
    pub favourites_count: u64,
    pub profile_image_url_https: String,
    pub location: String,
    pub url: String,
    pub verified: bool,
    pub is_blue_verified: bool,
    pub verified_type: String,
    pub protected: bool,
    pub can_dm: bool,
    pub created_at: String,
    pub profile_banner_url: String,
    pub media_count: u64,
    pub professional: bool,
}

/// Projects a raw user object from the API onto [`ShapedFollower`].
///
/// Absent fields, and fields holding a value of the wrong type, take their default.
pub fn shape_follower(user: &Value) -> ShapedFollower {
    let empty = Map::new();
    let legacy = user
        .get("legacy")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    ShapedFollower {
        id_str: user.get("rest_id").map(id_string).unwrap_or_default(),
        name: string_field(legacy.get("name")),
        screen_name: string_field(legacy.get("screen_name")),
        description: string_field(legacy.get("description")),
        statuses_count: count_field(legacy.get("statuses_count")),
        followers_count: count_field(legacy.get("followers_count")),
        friends_count: count_field(legacy.get("friends_count")),
        favourites_count: count_field(legacy.get("favourites_count")),
        profile_image_url_https: string_field(legacy.get("profile_image_url_https")),
        location: string_field(legacy.get("location")),
        url: string_field(legacy.get("url")),
        verified: bool_field(legacy.get("verified")),
        is_blue_verified: bool_field(user.get("is_blue_verified")),
        verified_type: string_field(user.get("verified_type")),
        protected: bool_field(legacy.get("protected")),
        can_dm: bool_field(user.get("can_dm")),
        created_at: string_field(legacy.get("created_at")),
        profile_banner_url: string_field(legacy.get("profile_banner_url")),
        media_count: count_field(legacy.get("media_count")),
        professional: user.get("professional").is_some_and(is_truthy),
    }
}

// rest_id is normally a string, but numeric ids render the same way
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn count_field(value: Option<&Value>) -> u64 {
    value.and_then(Value::as_u64).unwrap_or_default()
}

fn bool_field(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
