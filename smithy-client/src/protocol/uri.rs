//! `http` trait URI patterns.

use std::collections::HashMap;

use crate::error::ClientError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Label(String),
    /// `{name+}`, may span several path segments.
    GreedyLabel(String),
}

/// A parsed URI pattern such as `/buckets/{bucket}/objects/{key+}?list`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriPattern {
    segments: Vec<Segment>,
    query: Vec<(String, Option<String>)>,
}

impl UriPattern {
    pub fn parse(pattern: &str) -> Result<Self, ClientError> {
        let (path, query) = match pattern.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (pattern, None),
        };
        if !path.starts_with('/') {
            return Err(ClientError::illegal_state(format!(
                "URI pattern must start with `/`: {pattern}"
            )));
        }

        let mut segments = Vec::new();
        for raw in path[1..].split('/').filter(|s| !s.is_empty()) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(label) => match label.strip_suffix('+') {
                    Some(name) => Segment::GreedyLabel(name.to_string()),
                    None => Segment::Label(label.to_string()),
                },
                None => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
        }

        let query = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), Some(v.to_string())),
                None => (pair.to_string(), None),
            })
            .collect();

        Ok(Self { segments, query })
    }

    /// Label names in pattern order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Label(name) | Segment::GreedyLabel(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Literal query parameters of the pattern.
    pub fn literal_query(&self) -> &[(String, Option<String>)] {
        &self.query
    }

    /// Render the path with percent-encoded label values.
    ///
    /// A missing or empty label is an illegal state: the caller routed an
    /// input that cannot address a resource.
    pub fn expand(&self, labels: &HashMap<&str, String>) -> Result<String, ClientError> {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Label(name) => {
                    path.push_str(&urlencoding::encode(label_value(labels, name)?));
                }
                Segment::GreedyLabel(name) => {
                    let value = label_value(labels, name)?;
                    let encoded: Vec<_> = value
                        .trim_start_matches('/')
                        .split('/')
                        .map(urlencoding::encode)
                        .collect();
                    path.push_str(&encoded.join("/"));
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

fn label_value<'a>(labels: &'a HashMap<&str, String>, name: &str) -> Result<&'a str, ClientError> {
    match labels.get(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ClientError::illegal_state(format!(
            "missing value for required URI label `{name}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_and_expand() {
        let pattern = UriPattern::parse("/buckets/{bucket}/objects/{key+}?list&v=2").unwrap();
        assert_eq!(pattern.labels().collect::<Vec<_>>(), ["bucket", "key"]);
        assert_eq!(
            pattern.literal_query(),
            &[("list".to_string(), None), ("v".to_string(), Some("2".to_string()))]
        );

        let labels = HashMap::from([
            ("bucket", "my bucket".to_string()),
            ("key", "a/b c/d".to_string()),
        ]);
        assert_eq!(
            pattern.expand(&labels).unwrap(),
            "/buckets/my%20bucket/objects/a/b%20c/d"
        );
    }

    #[test]
    fn test_plain_label_encodes_slash() {
        let pattern = UriPattern::parse("/things/{id}").unwrap();
        let labels = HashMap::from([("id", "a/b".to_string())]);
        assert_eq!(pattern.expand(&labels).unwrap(), "/things/a%2Fb");
    }

    #[test]
    fn test_root_pattern() {
        let pattern = UriPattern::parse("/").unwrap();
        assert_eq!(pattern.expand(&HashMap::new()).unwrap(), "/");
    }

    #[test]
    fn test_missing_or_empty_label_is_illegal_state() {
        let pattern = UriPattern::parse("/things/{id}").unwrap();
        let err = pattern.expand(&HashMap::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IllegalState(_)));

        let labels = HashMap::from([("id", String::new())]);
        assert!(pattern.expand(&labels).is_err());
    }

    #[test]
    fn test_relative_pattern_rejected() {
        assert!(UriPattern::parse("things").is_err());
    }
}
