use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateSegment {
    Literal(String),
    Parameter(String),
}

/// A request path with optional `{name}` placeholders. Templates with the
/// same shape but different parameter names normalize to the same string,
/// which is what the registry orders and deduplicates on.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    segments: Vec<TemplateSegment>,
    normalized: String,
}

impl PathTemplate {
    pub fn parse(path: &str) -> Self {
        let segments: Vec<TemplateSegment> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                    TemplateSegment::Parameter(segment[1..segment.len() - 1].to_string())
                } else {
                    TemplateSegment::Literal(segment.to_string())
                }
            })
            .collect();
        let normalized = segments.iter().fold(String::new(), |mut out, segment| {
            out.push('/');
            match segment {
                TemplateSegment::Literal(literal) => out.push_str(literal),
                TemplateSegment::Parameter(_) => out.push_str("{}"),
            }
            out
        });
        Self {
            segments,
            normalized,
        }
    }

    /// The ordering and dedup key: literals verbatim, parameters as `{}`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn has_parameters(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, TemplateSegment::Parameter(_)))
    }

    /// Match a concrete path against this template, binding each parameter
    /// to its segment. `None` when the shape or any literal disagrees.
    pub fn bind(&self, path: &str) -> Option<HashMap<String, String>> {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.len() != self.segments.len() {
            return None;
        }
        let mut bindings = HashMap::new();
        for (segment, value) in self.segments.iter().zip(segments) {
            match segment {
                TemplateSegment::Literal(literal) => {
                    if literal != value {
                        return None;
                    }
                }
                TemplateSegment::Parameter(name) => {
                    bindings.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(bindings)
    }
}
