//! # Storefront routes
//!
//! The public pages of a storefront are addressed by path alone. A handful of
//! first segments are reserved; everything else is a creator's username.
use displaydoc::Display;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing a path
#[derive(Debug, Error, Display, PartialEq, Eq)]
pub enum RouteError {
    /// Path must start with `/`: {0:?}
    NotAbsolute(String),
    /// Invalid percent-encoding in {0:?}
    Encoding(String),
    /// No storefront page at {0:?}
    Unknown(String),
}

/// A page of the storefront
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/{username}`
    Profile { username: String },
    /// `/{username}/{slug}`
    Product { username: String, slug: String },
    /// `/p/{slug}`
    ProductShort { slug: String },
    /// `/bio/{username}`
    Bio { username: String },
    /// `/checkout/{productId}`
    Checkout { product_id: String },
    /// `/thank-you/{purchaseId}`
    ThankYou { purchase_id: String },
    /// `/content/{purchaseId}`
    Content { purchase_id: String },
    /// `/dashboard[/...]`
    Dashboard { section: Vec<String> },
}

const RESERVED: &[&str] = &["p", "bio", "checkout", "thank-you", "content", "dashboard", "login"];

fn segments(path: &str) -> Result<Vec<String>, RouteError> {
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    let mut iter = path.split('/');
    if iter.next() != Some("") {
        return Err(RouteError::NotAbsolute(path.to_owned()));
    }
    let mut parts: Vec<&str> = iter.collect();
    if parts.len() > 1 && parts.last() == Some(&"") {
        parts.pop();
    }
    parts
        .into_iter()
        .map(|part| {
            if part.is_empty() {
                return Err(RouteError::Unknown(path.to_owned()));
            }
            urlencoding::decode(part).map_err(|_| RouteError::Encoding(path.to_owned()))
        })
        .collect()
}

impl Route {
    /// Parse the path part of a URL
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let parts = segments(path)?;
        let unknown = || RouteError::Unknown(path.to_owned());
        let mut iter = parts.into_iter();
        let first = iter.next().ok_or_else(unknown)?;
        let rest: Vec<String> = iter.collect();

        let route = match (first.as_str(), rest.as_slice()) {
            ("dashboard", _) => Route::Dashboard {
                section: rest.clone(),
            },
            ("p", [slug]) => Route::ProductShort { slug: slug.clone() },
            ("bio", [username]) => Route::Bio {
                username: username.clone(),
            },
            ("checkout", [id]) => Route::Checkout {
                product_id: id.clone(),
            },
            ("thank-you", [id]) => Route::ThankYou {
                purchase_id: id.clone(),
            },
            ("content", [id]) => Route::Content {
                purchase_id: id.clone(),
            },
            (name, _) if RESERVED.contains(&name) => return Err(unknown()),
            (_, []) => Route::Profile {
                username: first.clone(),
            },
            (_, [slug]) => Route::Product {
                username: first.clone(),
                slug: slug.clone(),
            },
            _ => return Err(unknown()),
        };
        Ok(route)
    }

    /// Pages that need a signed-in creator
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Dashboard { .. })
    }

    /// The canonical path of this page
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use urlencoding::encode;
        match self {
            Route::Profile { username } => write!(f, "/{}", encode(username)),
            Route::Product { username, slug } => {
                write!(f, "/{}/{}", encode(username), encode(slug))
            }
            Route::ProductShort { slug } => write!(f, "/p/{}", encode(slug)),
            Route::Bio { username } => write!(f, "/bio/{}", encode(username)),
            Route::Checkout { product_id } => write!(f, "/checkout/{}", encode(product_id)),
            Route::ThankYou { purchase_id } => write!(f, "/thank-you/{}", encode(purchase_id)),
            Route::Content { purchase_id } => write!(f, "/content/{}", encode(purchase_id)),
            Route::Dashboard { section } => {
                f.write_str("/dashboard")?;
                for part in section {
                    write!(f, "/{}", encode(part))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_owned()
    }

    #[test]
    fn test_public_pages() {
        assert_eq!(
            Route::parse("/alice").unwrap(),
            Route::Profile { username: s("alice") }
        );
        assert_eq!(
            Route::parse("/alice/ebook-one/?ref=ig").unwrap(),
            Route::Product {
                username: s("alice"),
                slug: s("ebook-one")
            }
        );
        assert_eq!(
            Route::parse("/p/ebook-one").unwrap(),
            Route::ProductShort { slug: s("ebook-one") }
        );
        assert_eq!(
            Route::parse("/bio/j%C3%BCrgen").unwrap(),
            Route::Bio { username: s("jürgen") }
        );
        assert_eq!(
            Route::parse("/checkout/42").unwrap(),
            Route::Checkout { product_id: s("42") }
        );
        assert_eq!(
            Route::parse("/thank-you/p1").unwrap(),
            Route::ThankYou { purchase_id: s("p1") }
        );
        assert_eq!(
            Route::parse("/content/p1#top").unwrap(),
            Route::Content { purchase_id: s("p1") }
        );
    }

    #[test]
    fn test_dashboard_needs_auth() {
        let route = Route::parse("/dashboard/products/new").unwrap();
        assert!(route.requires_auth());
        assert_eq!(route.path(), "/dashboard/products/new");
        assert!(Route::parse("/dashboard").unwrap().requires_auth());
        assert!(!Route::parse("/bio/alice").unwrap().requires_auth());
    }

    #[test]
    fn test_invalid_paths() {
        assert_eq!(
            Route::parse("alice"),
            Err(RouteError::NotAbsolute(s("alice")))
        );
        assert!(Route::parse("/").is_err());
        assert!(Route::parse("//x").is_err());
        assert!(Route::parse("/bio").is_err());
        assert!(Route::parse("/checkout/1/2").is_err());
        assert!(Route::parse("/alice/a/b").is_err());
    }

    #[test]
    fn test_path_round_trip_encodes() {
        let route = Route::Bio {
            username: s("a b"),
        };
        assert_eq!(route.path(), "/bio/a%20b");
        assert_eq!(Route::parse(&route.path()).unwrap(), route);
    }
}
