use std::collections::HashMap;

use serde::Serialize;

use crate::config::FilterConfig;

pub const PAGE_KEY: &str = "page";
pub const SIZE_KEY: &str = "size";

/// Zero-based page window read from the same query map as the filter fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size: size.max(1) }
    }

    pub fn from_params(params: &HashMap<String, String>, config: &FilterConfig) -> Self {
        let page = params
            .get(PAGE_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let size = params
            .get(SIZE_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);
        Self::new(page, size)
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, total_elements: i64, request: PageRequest) -> Self {
        let size = request.size as i64;
        Self {
            content,
            total_elements,
            total_pages: (total_elements + size - 1) / size,
            page: request.page,
            size: request.size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            page: self.page,
            size: self.size,
        }
    }
}
