use std::collections::BTreeMap;

use super::table::{join_path, RouteTable};
use super::RouteDescriptor;

/// A request path resolved against the table.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    /// Full pattern of the matched route, e.g. `/dashboard/courses/:id`.
    pub pattern: String,
    /// Ancestors from the top-level route down to (excluding) the match.
    pub ancestors: Vec<&'a RouteDescriptor>,
    pub params: BTreeMap<String, String>,
}

struct Candidate<'a> {
    found: RouteMatch<'a>,
    static_segments: usize,
}

impl RouteTable {
    /// Resolve `path` to the most specific route. Static segments win over
    /// parameters; among equals the first declared route wins.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let requested = split_segments(strip_query(path));
        let mut best: Option<Candidate<'_>> = None;
        let mut ancestors = Vec::new();
        search(self.routes(), "", &requested, &mut ancestors, &mut best);
        best.map(|candidate| candidate.found)
    }
}

fn search<'a>(
    routes: &'a [RouteDescriptor],
    parent: &str,
    requested: &[&str],
    ancestors: &mut Vec<&'a RouteDescriptor>,
    best: &mut Option<Candidate<'a>>,
) {
    for route in routes {
        let pattern = join_path(parent, &route.path);
        let segments = split_segments(&pattern);

        if let Some((params, static_segments)) = match_segments(&segments, requested) {
            let better = best.as_ref().map_or(true, |current| static_segments > current.static_segments);
            if better {
                *best = Some(Candidate {
                    found: RouteMatch {
                        route,
                        pattern: pattern.clone(),
                        ancestors: ancestors.clone(),
                        params,
                    },
                    static_segments,
                });
            }
        }

        // only descend when the pattern is a prefix of the request
        if !route.children.is_empty() && segments.len() < requested.len() && match_segments(&segments, &requested[..segments.len()]).is_some() {
            ancestors.push(route);
            search(&route.children, &pattern, requested, ancestors, best);
            ancestors.pop();
        }
    }
}

fn match_segments(pattern: &[&str], requested: &[&str]) -> Option<(BTreeMap<String, String>, usize)> {
    if pattern.len() != requested.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    let mut static_segments = 0;
    for (expected, actual) in pattern.iter().zip(requested) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_string(), actual.to_string());
        } else if expected == actual {
            static_segments += 1;
        } else {
            return None;
        }
    }
    Some((params, static_segments))
}

fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}
