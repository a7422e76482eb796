//! Route handlers grouped by resource

pub mod edges;
pub mod health;
pub mod nodes;
pub mod systems;

/// Values of every repeated `id` parameter in a raw query string
pub(crate) fn query_ids(query: Option<&str>) -> Vec<String> {
    query
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .filter(|(key, _)| key == "id")
                .map(|(_, value)| value.into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_ids_collects_repeated_params() {
        assert_eq!(
            query_ids(Some("id=a&other=x&id=b%20c")),
            vec!["a".to_string(), "b c".to_string()]
        );
        assert!(query_ids(None).is_empty());
        assert!(query_ids(Some("")).is_empty());
    }
}
