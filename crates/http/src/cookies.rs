//! Read access to cookies for the CSRF attacher.

use std::collections::HashMap;
use std::sync::RwLock;

use reqwest::Url;
use reqwest::cookie::CookieStore;

/// Synchronous cookie lookup.
pub trait CookieSource: Send + Sync {
    fn cookie(&self, url: &Url, name: &str) -> Option<String>;
}

/// In-memory cookies, keyed by name only.
#[derive(Debug, Default)]
pub struct CookieMap {
    cookies: RwLock<HashMap<String, String>>,
}

impl CookieMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut cookies) = self.cookies.write() {
            cookies.insert(name.into(), value.into());
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut cookies) = self.cookies.write() {
            cookies.remove(name);
        }
    }
}

impl CookieSource for CookieMap {
    fn cookie(&self, _url: &Url, name: &str) -> Option<String> {
        self.cookies.read().ok()?.get(name).cloned()
    }
}

impl CookieSource for reqwest::cookie::Jar {
    fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.cookies(url)?;
        let header = header.to_str().ok()?;
        find_cookie(header, name)
    }
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`).
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}
