use log::debug;
use serde_json::{Map, Value, json};

use crate::error::SsError;
use crate::http::{self, Timeouts};

use super::query::SearchQuery;
use super::search::{SearchResult, SubtitleSearch};
use super::xmlrpc::{decode_response, encode_call};

pub(crate) const DEFAULT_ENDPOINT: &str = "http://api.opensubtitles.org/xml-rpc";
pub(crate) const USER_AGENT: &str = "OS Test User Agent";

/// XML-RPC client for the OpenSubtitles search API.
pub(crate) struct OpenSubtitlesClient {
    endpoint: String,
    user_agent: String,
    timeouts: Timeouts,
}

impl OpenSubtitlesClient {
    pub(crate) fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: USER_AGENT.to_string(),
            timeouts: Timeouts::default(),
        }
    }

    fn call(&self, method: &str, params: &[Value]) -> Result<Value, SsError> {
        let body = encode_call(method, params);
        debug!("XML-RPC {method} -> {}", self.endpoint);
        let raw = http::post_text(&self.endpoint, "text/xml", &body, &self.user_agent, self.timeouts)
            .map_err(SsError::Network)?;
        decode_response(&raw)
    }
}

fn status_of(response: &Value) -> &str {
    response.get("status").and_then(Value::as_str).unwrap_or("")
}

fn ensure_ok(method: &str, response: &Value) -> Result<(), SsError> {
    let status = status_of(response);
    if status.starts_with("200") {
        Ok(())
    } else {
        Err(SsError::Protocol(format!("{method} returned status '{status}'")))
    }
}

pub(crate) fn query_struct(query: &SearchQuery) -> Value {
    let mut members = Map::new();
    match query {
        SearchQuery::Name {
            text,
            season,
            episode,
            ..
        } => {
            members.insert("query".to_string(), json!(text));
            if let Some(season) = season {
                members.insert("season".to_string(), json!(season));
            }
            if let Some(episode) = episode {
                members.insert("episode".to_string(), json!(episode));
            }
        }
        SearchQuery::Fingerprint { hash, size, .. } => {
            members.insert("moviehash".to_string(), json!(hash));
            members.insert("moviebytesize".to_string(), json!(size.to_string()));
        }
    }
    members.insert("sublanguageid".to_string(), json!(query.language()));
    Value::Object(members)
}

/// Service fields arrive as strings, but be lenient about numbers.
fn field_text(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn parse_search_record(record: &Value) -> Option<SearchResult> {
    let download_link = field_text(record, "SubDownloadLink").filter(|link| !link.is_empty())?;
    let format = field_text(record, "SubFormat").filter(|format| !format.is_empty())?;
    Some(SearchResult {
        download_link,
        extension: format!(".{format}"),
        season: field_text(record, "SeriesSeason"),
        episode: field_text(record, "SeriesEpisode"),
        file_name: field_text(record, "SubFileName"),
    })
}

/// Splits the flat `data` list back into per-query lists using `QueryNumber`.
pub(crate) fn group_by_query(data: &Value, query_count: usize) -> Vec<Vec<SearchResult>> {
    let mut grouped = vec![Vec::new(); query_count];
    let Some(records) = data.as_array() else {
        return grouped;
    };

    for record in records {
        let Some(result) = parse_search_record(record) else {
            debug!("skipping search record without link or format");
            continue;
        };
        let index = match field_text(record, "QueryNumber").and_then(|n| n.parse::<usize>().ok()) {
            Some(index) => index,
            None if query_count == 1 => 0,
            None => {
                debug!("skipping search record without QueryNumber");
                continue;
            }
        };
        match grouped.get_mut(index) {
            Some(bucket) => bucket.push(result),
            None => debug!("skipping search record for unknown query {index}"),
        }
    }
    grouped
}

impl SubtitleSearch for OpenSubtitlesClient {
    fn log_in(&self) -> Result<String, SsError> {
        let response = self.call("LogIn", &[json!(""), json!(""), json!("en"), json!(self.user_agent)])?;
        let status = status_of(&response);
        if !status.starts_with("200") {
            return Err(SsError::Auth(status.to_string()));
        }
        response
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SsError::Auth("no token in LogIn response".to_string()))
    }

    fn search(
        &self,
        token: &str,
        queries: &[SearchQuery],
    ) -> Result<Vec<Vec<SearchResult>>, SsError> {
        let structs = queries.iter().map(query_struct).collect::<Vec<_>>();
        let response = self.call("SearchSubtitles", &[json!(token), Value::Array(structs)])?;
        ensure_ok("SearchSubtitles", &response)?;
        let data = response.get("data").cloned().unwrap_or(Value::Bool(false));
        Ok(group_by_query(&data, queries.len()))
    }

    fn log_out(&self, token: &str) -> Result<(), SsError> {
        let response = self.call("LogOut", &[json!(token)])?;
        ensure_ok("LogOut", &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::{Behavior, TestServer};
    use std::time::Duration;

    fn response_with(members: &str) -> Vec<u8> {
        format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value><struct>{members}</struct></value></param></params></methodResponse>"
        )
        .into_bytes()
    }

    fn member(name: &str, value: &str) -> String {
        format!("<member><name>{name}</name><value><string>{value}</string></value></member>")
    }

    fn record(query_number: &str, link: &str, season: &str, episode: &str) -> String {
        format!(
            "<value><struct>{}{}{}{}{}</struct></value>",
            member("QueryNumber", query_number),
            member("SubDownloadLink", link),
            member("SubFormat", "srt"),
            member("SeriesSeason", season),
            member("SeriesEpisode", episode),
        )
    }

    fn client(server: &TestServer) -> OpenSubtitlesClient {
        let mut client = OpenSubtitlesClient::new(server.base_url.clone());
        client.timeouts = Timeouts {
            connect: Duration::from_millis(300),
            read: Duration::from_millis(500),
        };
        client
    }

    #[test]
    fn query_structs_match_service_field_names() {
        let name = SearchQuery::Name {
            text: "\"Show\"".to_string(),
            season: Some(1),
            episode: Some(2),
            language: "eng".to_string(),
        };
        let hash = SearchQuery::Fingerprint {
            hash: "0123456789abcdef".to_string(),
            size: 734003200,
            language: "por".to_string(),
        };

        assert_eq!(
            query_struct(&name),
            json!({ "query": "\"Show\"", "season": 1, "episode": 2, "sublanguageid": "eng" })
        );
        assert_eq!(
            query_struct(&hash),
            json!({ "moviehash": "0123456789abcdef", "moviebytesize": "734003200", "sublanguageid": "por" })
        );
    }

    #[test]
    fn grouping_follows_query_number() {
        let data = json!([
            { "QueryNumber": "1", "SubDownloadLink": "http://x/b.gz", "SubFormat": "sub" },
            { "QueryNumber": "0", "SubDownloadLink": "http://x/a.gz", "SubFormat": "srt" },
            { "QueryNumber": "9", "SubDownloadLink": "http://x/z.gz", "SubFormat": "srt" },
            { "QueryNumber": "0", "SubFormat": "srt" },
            { "SubDownloadLink": "http://x/n.gz", "SubFormat": "srt" },
        ]);

        let grouped = group_by_query(&data, 2);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 1);
        assert_eq!(grouped[0][0].download_link, "http://x/a.gz");
        assert_eq!(grouped[1][0].extension, ".sub");
        assert_eq!(grouped[1].len(), 1);
    }

    #[test]
    fn single_query_adopts_unnumbered_records_and_false_data_is_empty() {
        let data = json!([{ "SubDownloadLink": "http://x/a.gz", "SubFormat": "srt" }]);
        assert_eq!(group_by_query(&data, 1)[0].len(), 1);
        assert_eq!(group_by_query(&json!(false), 3), vec![Vec::new(); 3]);
    }

    #[test]
    fn login_search_logout_round_trip() {
        let search_body = response_with(&format!(
            "{}<member><name>data</name><value><array><data>{}{}</data></array></value></member>",
            member("status", "200 OK"),
            record("0", "http://dl/1.gz", "1", "2"),
            record("1", "http://dl/2.gz", "", ""),
        ));
        let server = TestServer::spawn(vec![
            Behavior::ok(response_with(&(member("token", "tok-1") + &member("status", "200 OK")))),
            Behavior::ok(search_body),
            Behavior::ok(response_with(&member("status", "200 OK"))),
        ]);
        let client = client(&server);
        let queries = vec![
            SearchQuery::Name {
                text: "\"Show\"".to_string(),
                season: Some(1),
                episode: Some(2),
                language: "eng".to_string(),
            },
            SearchQuery::Fingerprint {
                hash: "0000000000020000".to_string(),
                size: 131072,
                language: "eng".to_string(),
            },
        ];

        let token = client.log_in().expect("login");
        let results = client.search(&token, &queries).expect("search");
        client.log_out(&token).expect("logout");

        assert_eq!(token, "tok-1");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0][0].season_episode(), Some((1, 2)));
        assert_eq!(results[1][0].download_link, "http://dl/2.gz");

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].contains("<methodName>LogIn</methodName>"));
        assert!(requests[1].contains("<methodName>SearchSubtitles</methodName>"));
        assert!(requests[1].contains("<string>tok-1</string>"));
        assert!(requests[1].contains("<name>moviehash</name>"));
        assert!(requests[2].contains("<methodName>LogOut</methodName>"));
    }

    #[test]
    fn rejected_login_is_auth_error() {
        let server = TestServer::spawn(vec![Behavior::ok(response_with(&member(
            "status",
            "401 Unauthorized",
        )))]);

        let result = client(&server).log_in();

        match result {
            Err(SsError::Auth(status)) => assert_eq!(status, "401 Unauthorized"),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[test]
    fn http_failure_is_network_error() {
        let server = TestServer::spawn(vec![Behavior::Respond(503, b"maintenance".to_vec())]);

        let result = client(&server).log_in();

        assert!(matches!(result, Err(SsError::Network(_))), "{result:?}");
    }
}
