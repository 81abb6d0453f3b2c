use crate::{
    directive::{line_of, Control, ControlKind, Template},
    expr::ExprError,
    format::{self, FormatError},
    model::{ApiModel, EntityKind, Item, Values},
};
use indexmap::IndexMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpandError {
    #[error("line {line}: placeholder {{{name}}} is not bound in this scope")]
    Unbound { name: String, line: usize },
    #[error("line {line}: {source}")]
    Format {
        line: usize,
        #[source]
        source: FormatError,
    },
    #[error("line {line}: `@foreach {kind}` must be nested inside a {owner} loop")]
    MissingOwner {
        kind: EntityKind,
        owner: &'static str,
        line: usize,
    },
    #[error("line {line}: condition `{condition}` failed: {source}")]
    Condition {
        condition: String,
        line: usize,
        #[source]
        source: ExprError,
    },
}

impl ExpandError {
    fn format(text: &str, offset: usize, e: FormatError) -> Self {
        let line = line_of(text, offset);
        match e {
            FormatError::Unbound(name) => Self::Unbound { name, line },
            source => Self::Format { line, source },
        }
    }

    fn condition(control: &Control, e: ExprError) -> Self {
        let line = control.line;
        if let Some(name) = e.unbound_name() {
            return Self::Unbound {
                name: name.to_owned(),
                line,
            };
        }
        Self::Condition {
            condition: control.condition.as_ref().map_or_else(String::new, |c| c.text().to_owned()),
            line,
            source: e,
        }
    }
}

/// Per-directive counters collected while expanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveStats {
    pub kind: ControlKind,
    pub line: usize,
    /// Items considered, before filtering.
    pub visited: usize,
    /// Items whose body was emitted.
    pub emitted: usize,
    pub elapsed: Duration,
}

/// Slices `text`, treating an inverted range as empty. Adjacent line-form
/// markers may overlap on the whitespace between them.
#[inline]
fn segment(text: &str, start: usize, end: usize) -> &str {
    if start < end {
        &text[start..end]
    } else {
        ""
    }
}

/// Layers values so the item wins over its innermost parent, which wins over
/// the next parent out.
fn merged_values(item: &Item<'_>, parents: &[Item<'_>]) -> Values {
    let mut values = Values::new();
    for parent in parents.iter().rev() {
        values.extend(parent.values());
    }
    values.extend(item.values());
    values
}

pub struct Expander<'m> {
    model: &'m ApiModel,
    stats: Option<IndexMap<usize, DirectiveStats>>,
}

impl<'m> Expander<'m> {
    pub fn new(model: &'m ApiModel) -> Self {
        Expander {
            model,
            stats: None,
        }
    }

    /// Collect [`DirectiveStats`] for every directive expanded.
    pub fn with_profiling(mut self) -> Self {
        self.stats = Some(IndexMap::new());
        self
    }

    /// Statistics in template order, if profiling was enabled.
    pub fn stats(&self) -> Option<Vec<&DirectiveStats>> {
        self.stats.as_ref().map(|stats| {
            let mut stats: Vec<_> = stats.values().collect();
            stats.sort_by_key(|s| s.line);
            stats
        })
    }

    /// Expands every top-level directive and substitutes the text between
    /// them with no bindings.
    pub fn expand_template(&mut self, template: &Template<'_>) -> Result<String, ExpandError> {
        let text = template.text;
        let empty = Values::new();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for control in &template.controls {
            let s = segment(text, last, control.open.start);
            out.push_str(&format::substitute(s, &empty).map_err(|e| ExpandError::format(text, last, e))?);
            out.push_str(&self.expand(text, control, &[])?);
            last = control.close.end;
        }
        let s = segment(text, last, text.len());
        out.push_str(&format::substitute(s, &empty).map_err(|e| ExpandError::format(text, last, e))?);
        Ok(out)
    }

    /// Expands one control for every item of its domain. `parents` holds the
    /// enclosing items, innermost first.
    pub fn expand(&mut self, text: &str, control: &Control, parents: &[Item<'m>]) -> Result<String, ExpandError> {
        let started = Instant::now();
        let items = self.items(control, parents)?;
        let visited = items.len();
        let mut emitted = 0;
        let mut out = String::new();
        let mut scope = Vec::with_capacity(parents.len() + 1);
        for item in items {
            let values = merged_values(&item, parents);
            if let Some(condition) = &control.condition {
                let keep = condition.evaluate(&values)
                    .map_err(|e| ExpandError::condition(control, e))?;
                if !keep {
                    continue;
                }
            }
            emitted += 1;

            let guard = self.model.extension_for(&item)
                .and_then(|ext| ext.guard.as_deref());
            if let Some(guard) = guard {
                out.push_str(&format!("#if defined({})\n", guard));
            }

            scope.clear();
            scope.push(item);
            scope.extend_from_slice(parents);
            let mut last = control.open.end;
            for child in &control.children {
                let s = segment(text, last, child.open.start);
                out.push_str(&format::substitute(s, &values).map_err(|e| ExpandError::format(text, last, e))?);
                out.push_str(&self.expand(text, child, &scope)?);
                last = child.close.end;
            }
            let s = segment(text, last, control.close.start);
            out.push_str(&format::substitute(s, &values).map_err(|e| ExpandError::format(text, last, e))?);

            if let Some(guard) = guard {
                out.push_str(&format!("#endif // {}\n", guard));
            }
        }
        trace!("{} at line {}: emitted {} of {}", control.kind, control.line, emitted, visited);
        self.record(control, visited, emitted, started.elapsed());
        Ok(out)
    }

    fn record(&mut self, control: &Control, visited: usize, emitted: usize, elapsed: Duration) {
        let Some(stats) = self.stats.as_mut() else {
            return;
        };
        let entry = stats.entry(control.open.start).or_insert_with(|| DirectiveStats {
            kind: control.kind,
            line: control.line,
            visited: 0,
            emitted: 0,
            elapsed: Duration::ZERO,
        });
        entry.visited += visited;
        entry.emitted += emitted;
        entry.elapsed += elapsed;
    }

    /// Resolves the iteration domain of `control`.
    fn items(&self, control: &Control, parents: &[Item<'m>]) -> Result<Vec<Item<'m>>, ExpandError> {
        let kind = match control.kind {
            ControlKind::If => return Ok(vec![Item::Sentinel]),
            ControlKind::Each(kind) => kind,
        };
        let missing = |owner: &'static str| ExpandError::MissingOwner {
            kind,
            owner,
            line: control.line,
        };
        let items = match kind {
            EntityKind::Member => parents.iter()
                .find_map(get_variant!(Item::Struct))
                .ok_or_else(|| missing("struct"))?
                .members
                .iter()
                .map(Item::Member)
                .collect(),
            EntityKind::Parameter => parents.iter()
                .find_map(get_variant!(Item::Function))
                .ok_or_else(|| missing("function"))?
                .parameters
                .iter()
                .map(Item::Parameter)
                .collect(),
            EntityKind::Choice => parents.iter()
                .find_map(get_variant!(Item::Union))
                .ok_or_else(|| missing("union"))?
                .choices
                .iter()
                .map(Item::Choice)
                .collect(),
            EntityKind::Option => parents.iter()
                .find_map(|p| match *p {
                    Item::Enum(e) => Some(e.options.as_slice()),
                    Item::Bitmask(b) => Some(b.options.as_slice()),
                    _ => None,
                })
                .ok_or_else(|| missing("enum or bitmask"))?
                .iter()
                .map(Item::Option)
                .collect(),
            kind => self.model.items(kind),
        };
        Ok(items)
    }
}

/// Parses and expands `text` against `model` in one step.
pub fn expand_str(text: &str, model: &ApiModel) -> Result<String, crate::GenerateError> {
    let template = Template::parse(text)?;
    Ok(Expander::new(model).expand_template(&template)?)
}
