//! Integration tests for the location codec and the API transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use stepform_core::{FieldValue, FormData, Settings};
use stepform_http::{
    encode_query, parse_query, ApiTransport, Location, Method, QueryMap, Transport,
    TransportError,
};

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, FormData)>>,
}

#[async_trait]
impl Transport for Recorder {
    async fn request(
        &self,
        _method: Method,
        endpoint: &str,
        payload: &FormData,
    ) -> Result<Value, TransportError> {
        self.seen
            .lock()
            .unwrap()
            .push((endpoint.to_string(), payload.clone()));
        if endpoint.ends_with("/missing") {
            return Err(TransportError::http(404, "Not Found"));
        }
        Ok(json!({"status": true}))
    }
}

#[test]
fn test_query_round_trip_with_lists_and_dicts() {
    let mut map = QueryMap::new();
    map.insert("q".into(), FieldValue::Text("multi step".into()));
    map.insert(
        "ids".into(),
        FieldValue::List(vec!["1".into(), "2".into()]),
    );
    map.insert("__form_data_step".into(), FieldValue::from(3_usize));

    let encoded = encode_query(&map);
    assert!(encoded.contains("ids[]=1&ids[]=2"));
    assert_eq!(parse_query(&encoded, false), map);
}

#[test]
fn test_location_rebuild_keeps_origin_and_path() {
    let location = Location::parse("https://example.com:8443/orders/new?ref=mail#step=2").unwrap();
    assert_eq!(location.origin(), "https://example.com:8443");
    assert_eq!(location.hash()["step"], FieldValue::Text("2".into()));

    let mut query = location.query().clone();
    query.insert("__form_data_step".into(), FieldValue::from(1_usize));
    let href = location.with_query(&query);
    assert_eq!(
        href,
        "https://example.com:8443/orders/new?__form_data_step=1&ref=mail"
    );

    let reparsed = Location::parse(&href).unwrap();
    assert_eq!(reparsed.query(), &query);
}

#[tokio::test]
async fn test_api_transport_prefixes_and_annotates() {
    let mut settings = Settings::default();
    settings.language_code = "uk".into();
    settings.include_user_agent = true;
    settings.user_agent = Some("stepform-tests".into());
    let recorder = Arc::new(Recorder::default());
    let transport = ApiTransport::new(recorder.clone(), settings);

    let mut payload = FormData::new();
    payload.insert("email".into(), FieldValue::Text("a@b.c".into()));
    transport
        .request(Method::POST, "form/validate/signup", &payload)
        .await
        .unwrap();

    {
        let seen = recorder.seen.lock().unwrap();
        let (url, sent) = &seen[0];
        assert_eq!(url, "/api/1/form/validate/signup");
        assert_eq!(sent["email"], FieldValue::Text("a@b.c".into()));
        assert_eq!(sent["__lang"], FieldValue::Text("uk".into()));
        assert_eq!(sent["__user_agent"], FieldValue::Text("stepform-tests".into()));
    }

    let err = transport
        .request(Method::GET, "/missing", &FormData::new())
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Not Found");
}
