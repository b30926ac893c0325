use serde::Serialize;

/// `{ success: true, data, ... }` success body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            count: None,
            pagination: None,
            client_secret: None,
            data,
        }
    }

    pub fn with_client_secret(mut self, secret: String) -> Self {
        self.client_secret = Some(secret);
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        let mut response = Self::ok(data);
        response.count = Some(response.data.len());
        response
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

/// Links to the neighbouring pages; an empty object on a single page.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let start = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let end = u64::from(page) * u64::from(limit);

        Self {
            next: (end < total).then_some(PageLink { page: page.saturating_add(1), limit }),
            prev: (start > 0).then_some(PageLink { page: page.saturating_sub(1), limit }),
        }
    }
}
