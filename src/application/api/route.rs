//! Method + path-template routing.
//!
//! Templates are `/`-separated literals, where the `{id}` segment only
//! matches a lowercase hyphenated UUID. A path whose id segment has another
//! shape matches no route at all.

use hyper::Method;
use uuid::Uuid;

const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Id,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone)]
struct Route<H> {
    method: Method,
    segments: Vec<Segment>,
    handler: H,
}

impl<H> Route<H> {
    fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut params = RouteParams::default();
        let mut parts = split(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Id if is_canonical_uuid(part) => {
                    params.id = Some(Uuid::parse_str(part).ok()?);
                }
                _ => return None,
            }
        }
        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum RouteMatch<'a, H> {
    Found { handler: &'a H, params: RouteParams },
    /// The path is routed, but only for these methods.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, template: &str, handler: H) -> Self {
        let segments = split(template)
            .map(|part| match part {
                ID_PLACEHOLDER => Segment::Id,
                literal => Segment::Literal(literal.to_owned()),
            })
            .collect();
        self.routes.push(Route {
            method,
            segments,
            handler,
        });
        self
    }

    /// First registered route matching both `method` and `path`.
    pub fn find(&self, method: &Method, path: &str) -> RouteMatch<'_, H> {
        let mut allowed: Vec<Method> = Vec::new();
        for route in &self.routes {
            if let Some(params) = route.matches(path) {
                if route.method == *method {
                    return RouteMatch::Found {
                        handler: &route.handler,
                        params,
                    };
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method.clone());
                }
            }
        }
        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed(allowed)
        }
    }
}

fn split(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// `[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}`
pub fn is_canonical_uuid(segment: &str) -> bool {
    segment.len() == 36
        && segment.bytes().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
        })
}
