//! # Patrones de Ruta
//! src/router/pattern.rs
//!
//! Matching por segmentos de path, sin expresiones regulares.
//!
//! | Patrón            | Coincide con                          | No coincide con   |
//! |-------------------|---------------------------------------|-------------------|
//! | `/users`          | `/users`                              | `/users/1`        |
//! | `/users/*/posts`  | `/users/7/posts`                      | `/users/posts`    |
//! | `/static/*`       | `/static/`, `/static/css/app.css`     | `/static`         |
//! | `/files/*.txt`    | `/files/notas.txt`                    | `/files/a/b.txt`  |
//!
//! - Un segmento `*` en medio del patrón consume exactamente un segmento.
//! - Un `*` como último segmento consume el resto del path (uno o más
//!   segmentos, aunque el último esté vacío).
//! - Un `*` dentro de un segmento (`*.txt`) consume caracteres sin cruzar `/`.

/// Componente de un patrón
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Segmento con `*` parcial, p. ej. `img-*.png`
    Glob(String),
    /// Segmento `*` completo
    Any,
}

/// Patrón de ruta precompilado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
    wildcard: bool,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .map(|s| {
                if s == "*" {
                    Segment::Any
                } else if s.contains('*') {
                    Segment::Glob(s.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
            wildcard: pattern.contains('*'),
        }
    }

    /// Texto original del patrón
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` si el patrón contiene algún `*`
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Verifica si el path completo coincide con el patrón
    pub fn matches(&self, path: &str) -> bool {
        if self.raw == path {
            return true;
        }
        if !self.wildcard {
            return false;
        }

        let parts: Vec<&str> = split_segments(path).collect();
        let last = self.segments.len().saturating_sub(1);

        for (i, segment) in self.segments.iter().enumerate() {
            // `*` final: basta con que quede al menos un segmento
            if i == last && *segment == Segment::Any {
                return parts.len() > i;
            }

            let Some(part) = parts.get(i) else {
                return false;
            };

            let ok = match segment {
                Segment::Literal(lit) => lit == part,
                Segment::Glob(glob) => glob_match(glob.as_bytes(), part.as_bytes()),
                Segment::Any => true,
            };
            if !ok {
                return false;
            }
        }

        parts.len() == self.segments.len()
    }
}

/// Segmentos de un path sin la `/` inicial
///
/// `/a/b/` produce `["a", "b", ""]`; `/` produce `[""]`.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Glob de un solo segmento donde `*` consume cero o más caracteres
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((sp, st)) = star {
            // Retroceder: el último `*` consume un carácter más
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
