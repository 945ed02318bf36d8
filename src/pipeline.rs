use std::collections::{BTreeMap, BTreeSet};

use crate::symbols::Symbol;

/// Where a symbol came from: a plain class file or an entry inside a jar.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Origin {
    /// Containing jar path, when the class came from an archive.
    pub jar: Option<String>,
    /// Class file path, or the entry name inside the jar.
    pub file: String,
}

impl Origin {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            jar: None,
            file: path.into(),
        }
    }

    pub fn jar_entry(jar: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            jar: Some(jar.into()),
            file: entry.into(),
        }
    }

    /// Label used by block headers and `prepend_filename`.
    pub fn label(&self) -> String {
        match &self.jar {
            Some(jar) => format!("{}({})", jar, self.file),
            None => self.file.clone(),
        }
    }
}

/// One symbol paired with the class block it came from.
#[derive(Clone, Debug)]
pub struct SymbolRecord {
    pub origin: Origin,
    pub symbol: Symbol,
}

/// Built-in filter stages, applied in order over the whole record set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    /// Drop references whose target is defined in the same class block.
    ResolveClass,
    /// Drop references whose target is defined anywhere in the input set.
    ResolveAll,
    RemoveDefined,
    RemoveUndefined,
    RemovePrivate,
    RemoveNonClass,
}

/// Built-in sort stages. All sorts are stable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sort {
    Noop,
    Alphabetic,
    Numeric,
    Reverse,
}

/// Built-in display stages; each rewrites the previously rendered line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Display {
    Normal,
    PrependFilename,
    NameOnly,
    Demangle,
}

/// Ordered filter, sort, and display stages. `resolve_class` always runs
/// first and `normal_display` always renders first.
pub struct Pipeline {
    filters: Vec<Filter>,
    sorts: Vec<Sort>,
    displays: Vec<Display>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            filters: vec![Filter::ResolveClass],
            sorts: Vec::new(),
            displays: vec![Display::Normal],
        }
    }

    pub fn add_filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn add_sort(&mut self, sort: Sort) -> &mut Self {
        self.sorts.push(sort);
        self
    }

    pub fn add_display(&mut self, display: Display) -> &mut Self {
        self.displays.push(display);
        self
    }

    /// Apply the filter stages over the whole record set.
    pub fn filter(&self, mut records: Vec<SymbolRecord>) -> Vec<SymbolRecord> {
        for filter in &self.filters {
            records = apply_filter(*filter, records);
        }
        records
    }

    /// Apply the sort stages, preserving discovery order within equal keys.
    pub fn sort(&self, records: &mut [SymbolRecord]) {
        for sort in &self.sorts {
            apply_sort(*sort, records);
        }
    }

    /// Filter then sort the record set.
    pub fn process(&self, records: Vec<SymbolRecord>) -> Vec<SymbolRecord> {
        let mut records = self.filter(records);
        self.sort(&mut records);
        records
    }

    /// Render one record through the display chain.
    pub fn render(&self, record: &SymbolRecord) -> String {
        let mut line = String::new();
        for display in &self.displays {
            line = apply_display(*display, line, record);
        }
        line
    }
}

fn apply_filter(filter: Filter, records: Vec<SymbolRecord>) -> Vec<SymbolRecord> {
    match filter {
        Filter::ResolveClass => {
            let mut defined: BTreeMap<Origin, BTreeSet<String>> = BTreeMap::new();
            for record in &records {
                if !record.symbol.kind.is_reference() {
                    defined
                        .entry(record.origin.clone())
                        .or_default()
                        .insert(record.symbol.name.clone());
                }
            }
            records
                .into_iter()
                .filter(|record| {
                    !record.symbol.kind.is_reference()
                        || !defined
                            .get(&record.origin)
                            .is_some_and(|names| names.contains(&record.symbol.name))
                })
                .collect()
        }
        Filter::ResolveAll => {
            let defined: BTreeSet<String> = records
                .iter()
                .filter(|record| !record.symbol.kind.is_reference())
                .map(|record| record.symbol.name.clone())
                .collect();
            records
                .into_iter()
                .filter(|record| {
                    !record.symbol.kind.is_reference() || !defined.contains(&record.symbol.name)
                })
                .collect()
        }
        Filter::RemoveDefined => records
            .into_iter()
            .filter(|record| record.symbol.kind.is_reference())
            .collect(),
        Filter::RemoveUndefined => records
            .into_iter()
            .filter(|record| !record.symbol.kind.is_reference())
            .collect(),
        Filter::RemovePrivate => records
            .into_iter()
            .filter(|record| record.symbol.kind_char().is_ascii_uppercase())
            .collect(),
        Filter::RemoveNonClass => records
            .into_iter()
            .filter(|record| record.symbol.kind.is_class())
            .collect(),
    }
}

fn apply_sort(sort: Sort, records: &mut [SymbolRecord]) {
    match sort {
        Sort::Noop => {}
        Sort::Alphabetic => {
            records.sort_by(|a, b| a.symbol.name.cmp(&b.symbol.name));
        }
        Sort::Numeric => {
            // None sorts after every defined value.
            records.sort_by(|a, b| match (a.symbol.value, b.symbol.value) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
        Sort::Reverse => records.reverse(),
    }
}

fn apply_display(display: Display, line: String, record: &SymbolRecord) -> String {
    let symbol = &record.symbol;
    match display {
        Display::Normal => match symbol.value {
            Some(value) => format!("{:08x} {} {}", value, symbol.kind_char(), symbol.name),
            None => format!("{:9}{} {}", "", symbol.kind_char(), symbol.name),
        },
        Display::PrependFilename => format!("{}: {}", record.origin.label(), line),
        Display::NameOnly => symbol.name.clone(),
        Display::Demangle => {
            let Some(expanded) = &symbol.expanded_name else {
                return line;
            };
            // Applying the stage twice must not expand twice.
            if line.ends_with(expanded.as_str()) {
                return line;
            }
            match line.strip_suffix(symbol.name.as_str()) {
                Some(prefix) => format!("{prefix}{expanded}"),
                None => line,
            }
        }
    }
}
