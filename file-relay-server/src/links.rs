use url::{form_urlencoded, Url};

/// Path of the retrieval endpoint.
pub const FILE_ROUTE: &str = "/api/file";

/// Builds the URL handed back to uploaders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetrievalLinks {
    base: Option<Url>,
}

impl RetrievalLinks {
    /// Path-only links, resolved by the client against whatever host it called.
    pub fn relative() -> Self {
        Self { base: None }
    }

    /// Links rooted at a public origin. Any path on `base` is kept as a prefix.
    pub fn absolute(mut base: Url) -> Self {
        base.set_query(None);
        base.set_fragment(None);
        Self { base: Some(base) }
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    pub fn url_for(&self, key: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("key", key)
            .finish();
        match &self.base {
            Some(base) => format!("{}{}?{}", base.as_str().trim_end_matches('/'), FILE_ROUTE, query),
            None => format!("{}?{}", FILE_ROUTE, query),
        }
    }
}
