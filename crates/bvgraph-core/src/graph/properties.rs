//! Graph properties: the `<basename>.properties` metadata file.
//!
//! The file uses the Java `.properties` syntax and records everything needed
//! to interpret the bitstream:
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `nodes` | vertex count `N` | required |
//! | `arcs` | edge count `M` | required |
//! | `windowsize` | max reference distance `W` (0 disables references) | 7 |
//! | `maxrefcount` | max reference chain length (-1 for unbounded) | 3 |
//! | `minintervallength` | shortest run coded as an interval (0 disables) | 3 |
//! | `zetak` | order of the zeta code | 3 |
//! | `compressionflags` | `|`-separated `COMPONENT_CODE` overrides | empty |
//!
//! `version` must be 0 and `graphclass`, when present, must name BVGraph.
//! Any other key is carried along untouched.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use bvgraph_common::utils::error::{Error, Result};
use serde::Serialize;

use crate::codec::Code;

/// Class names accepted in the `graphclass` key.
const GRAPH_CLASSES: [&str; 2] = [
    "it.unimi.dsi.webgraph.BVGraph",
    "class it.unimi.dsi.webgraph.BVGraph",
];

/// Default reference window.
pub const DEFAULT_WINDOW_SIZE: u64 = 7;
/// Default maximum reference chain length.
pub const DEFAULT_MAX_REF_COUNT: u64 = 3;
/// Default minimum interval length.
pub const DEFAULT_MIN_INTERVAL_LENGTH: u64 = 3;
/// Default zeta order.
pub const DEFAULT_ZETA_K: u32 = 3;
/// Largest accepted reference window. Every cursor keeps `W + 1` lists.
pub const MAX_WINDOW_SIZE: u64 = 1 << 16;
/// Largest accepted bounded reference chain.
pub const MAX_REF_COUNT: u64 = u32::MAX as u64;

/// Code used for each component of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionFlags {
    /// Outdegrees.
    pub outdegrees: Code,
    /// Copy-block lengths.
    pub blocks: Code,
    /// Residual gaps.
    pub residuals: Code,
    /// Reference distances.
    pub references: Code,
    /// Number of copy blocks.
    pub block_count: Code,
    /// Deltas in the offsets file.
    pub offsets: Code,
}

impl CompressionFlags {
    /// The WebGraph defaults for a given zeta order.
    #[must_use]
    pub fn with_zeta(zeta_k: u32) -> Self {
        Self {
            outdegrees: Code::Gamma,
            blocks: Code::Gamma,
            residuals: Code::Zeta { k: zeta_k },
            references: Code::Unary,
            block_count: Code::Gamma,
            offsets: Code::Gamma,
        }
    }

    /// Parses a `compressionflags` value on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] for an unknown component or code.
    pub fn parse(text: &str, zeta_k: u32) -> Result<Self> {
        let mut flags = Self::with_zeta(zeta_k);
        for flag in text.split('|').map(str::trim).filter(|f| !f.is_empty()) {
            let (component, code) = Self::COMPONENTS
                .iter()
                .find_map(|&name| {
                    flag.strip_prefix(name)
                        .and_then(|rest| rest.strip_prefix('_'))
                        .map(|code| (name, code))
                })
                .ok_or_else(|| Error::format(format!("unknown compression flag {flag}")))?;
            let code = Code::from_name(code, zeta_k)
                .ok_or_else(|| Error::format(format!("unsupported coding in flag {flag}")))?;
            *flags.slot_mut(component) = code;
        }
        Ok(flags)
    }

    const COMPONENTS: [&'static str; 6] = [
        "OUTDEGREES",
        "BLOCK_COUNT",
        "BLOCKS",
        "RESIDUALS",
        "REFERENCES",
        "OFFSETS",
    ];

    fn slot_mut(&mut self, component: &str) -> &mut Code {
        match component {
            "OUTDEGREES" => &mut self.outdegrees,
            "BLOCK_COUNT" => &mut self.block_count,
            "BLOCKS" => &mut self.blocks,
            "RESIDUALS" => &mut self.residuals,
            "REFERENCES" => &mut self.references,
            _ => &mut self.offsets,
        }
    }

    fn slot(&self, component: &str) -> Code {
        match component {
            "OUTDEGREES" => self.outdegrees,
            "BLOCK_COUNT" => self.block_count,
            "BLOCKS" => self.blocks,
            "RESIDUALS" => self.residuals,
            "REFERENCES" => self.references,
            _ => self.offsets,
        }
    }

    /// Renders the non-default entries as a `compressionflags` value.
    #[must_use]
    pub fn render(&self, zeta_k: u32) -> String {
        let defaults = Self::with_zeta(zeta_k);
        Self::COMPONENTS
            .iter()
            .filter(|&&c| self.slot(c) != defaults.slot(c))
            .map(|&c| format!("{c}_{}", self.slot(c).name()))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Immutable graph parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyStore {
    nodes: u64,
    arcs: u64,
    window_size: u64,
    max_ref_count: Option<u64>,
    min_interval_length: u64,
    zeta_k: u32,
    flags: CompressionFlags,
    bits_per_link: Option<f64>,
    #[serde(skip)]
    extra: BTreeMap<String, String>,
}

impl PropertyStore {
    /// Creates a store with the default compression parameters.
    #[must_use]
    pub fn new(nodes: u64, arcs: u64) -> Self {
        Self {
            nodes,
            arcs,
            window_size: DEFAULT_WINDOW_SIZE,
            max_ref_count: Some(DEFAULT_MAX_REF_COUNT),
            min_interval_length: DEFAULT_MIN_INTERVAL_LENGTH,
            zeta_k: DEFAULT_ZETA_K,
            flags: CompressionFlags::with_zeta(DEFAULT_ZETA_K),
            bits_per_link: None,
            extra: BTreeMap::new(),
        }
    }

    /// Sets the reference window.
    pub fn with_window_size(mut self, window_size: u64) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets the maximum reference chain length (`None` for unbounded).
    pub fn with_max_ref_count(mut self, max_ref_count: Option<u64>) -> Self {
        self.max_ref_count = max_ref_count;
        self
    }

    /// Sets the minimum interval length.
    pub fn with_min_interval_length(mut self, min_interval_length: u64) -> Self {
        self.min_interval_length = min_interval_length;
        self
    }

    /// Sets the zeta order, re-parameterizing any zeta-coded component.
    pub fn with_zeta_k(mut self, zeta_k: u32) -> Self {
        self.zeta_k = zeta_k;
        for c in CompressionFlags::COMPONENTS {
            if let Code::Zeta { k } = self.flags.slot_mut(c) {
                *k = zeta_k;
            }
        }
        self
    }

    /// Replaces the component codes.
    pub fn with_flags(mut self, flags: CompressionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Parses the contents of a `.properties` file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the syntax is invalid, `nodes` or `arcs`
    /// is missing, a number is malformed, or the graph class or version is
    /// not supported.
    pub fn parse(text: &str) -> Result<Self> {
        let mut map = parse_java_properties(text)?;

        if let Some(class) = map.remove("graphclass") {
            if !GRAPH_CLASSES.contains(&class.trim()) {
                return Err(Error::format(format!("unsupported graph class {class}")));
            }
        }
        if let Some(version) = map.remove("version") {
            if parse_number::<u64>(&version, "version")? != 0 {
                return Err(Error::format(format!("unsupported version {version}")));
            }
        }

        let nodes = required(&mut map, "nodes")?;
        let arcs = required(&mut map, "arcs")?;
        let window_size = optional(&mut map, "windowsize")?.unwrap_or(DEFAULT_WINDOW_SIZE);
        let min_interval_length =
            optional(&mut map, "minintervallength")?.unwrap_or(DEFAULT_MIN_INTERVAL_LENGTH);

        let max_ref_count = match map.remove("maxrefcount") {
            Some(v) => {
                let v = parse_number::<i64>(&v, "maxrefcount")?;
                u64::try_from(v).ok()
            }
            None => Some(DEFAULT_MAX_REF_COUNT),
        };

        let zeta_k = optional::<u32>(&mut map, "zetak")?.unwrap_or(DEFAULT_ZETA_K);
        if zeta_k == 0 {
            return Err(Error::format("zetak must be at least 1"));
        }

        let flags = match map.remove("compressionflags") {
            Some(text) => CompressionFlags::parse(&text, zeta_k)?,
            None => CompressionFlags::with_zeta(zeta_k),
        };

        let bits_per_link = optional::<f64>(&mut map, "bitsperlink")?;

        let store = Self {
            nodes,
            arcs,
            window_size,
            max_ref_count,
            min_interval_length,
            zeta_k,
            flags,
            bits_per_link,
            extra: map,
        };
        store.check_limits()?;
        Ok(store)
    }

    /// Rejects parameters no decoder can honor: a window above
    /// [`MAX_WINDOW_SIZE`] or a chain bound above [`MAX_REF_COUNT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] naming the offending key.
    pub fn check_limits(&self) -> Result<()> {
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(Error::format(format!(
                "windowsize {} exceeds the limit of {MAX_WINDOW_SIZE}",
                self.window_size
            )));
        }
        if let Some(max) = self.max_ref_count.filter(|&m| m > MAX_REF_COUNT) {
            return Err(Error::format(format!(
                "maxrefcount {max} exceeds the limit of {MAX_REF_COUNT}"
            )));
        }
        Ok(())
    }

    /// Reads and parses a `.properties` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Renders the store in `.properties` syntax.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("#BVGraph properties\n");
        let _ = writeln!(out, "graphclass={}", GRAPH_CLASSES[0]);
        let _ = writeln!(out, "version=0");
        let _ = writeln!(out, "nodes={}", self.nodes);
        let _ = writeln!(out, "arcs={}", self.arcs);
        let _ = writeln!(out, "windowsize={}", self.window_size);
        let max_ref = self.max_ref_count.map_or(-1, |m| m as i64);
        let _ = writeln!(out, "maxrefcount={max_ref}");
        let _ = writeln!(out, "minintervallength={}", self.min_interval_length);
        let _ = writeln!(out, "zetak={}", self.zeta_k);
        let _ = writeln!(out, "compressionflags={}", self.flags.render(self.zeta_k));
        if let Some(bpl) = self.bits_per_link {
            let _ = writeln!(out, "bitsperlink={bpl}");
        }
        for (key, value) in &self.extra {
            let _ = writeln!(out, "{key}={value}");
        }
        out
    }

    /// Vertex count `N`.
    #[must_use]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Edge count `M`.
    #[must_use]
    pub fn arcs(&self) -> u64 {
        self.arcs
    }

    /// Reference window `W`; 0 when references are disabled.
    #[must_use]
    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Longest permitted reference chain, `None` when unbounded.
    #[must_use]
    pub fn max_ref_count(&self) -> Option<u64> {
        self.max_ref_count
    }

    /// Minimum interval length; 0 when intervals are disabled.
    #[must_use]
    pub fn min_interval_length(&self) -> u64 {
        self.min_interval_length
    }

    /// Zeta order.
    #[must_use]
    pub fn zeta_k(&self) -> u32 {
        self.zeta_k
    }

    /// Per-component codes.
    #[must_use]
    pub fn flags(&self) -> &CompressionFlags {
        &self.flags
    }

    /// Average bits per arc recorded by the compressor, if any.
    #[must_use]
    pub fn bits_per_link(&self) -> Option<f64> {
        self.bits_per_link
    }

    /// Returns a key that is not interpreted by the decoder.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Whether successor lists may reference earlier lists.
    #[must_use]
    pub fn uses_references(&self) -> bool {
        self.window_size > 0
    }

    /// Whether runs of consecutive successors are interval-coded.
    #[must_use]
    pub fn uses_intervals(&self) -> bool {
        self.min_interval_length > 0
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::format(format!("invalid value for {key}: {value:?}")))
}

fn required(map: &mut BTreeMap<String, String>, key: &str) -> Result<u64> {
    let value = map
        .remove(key)
        .ok_or_else(|| Error::format(format!("missing required property {key}")))?;
    parse_number(&value, key)
}

fn optional<T: std::str::FromStr>(map: &mut BTreeMap<String, String>, key: &str) -> Result<Option<T>> {
    map.remove(key).map(|v| parse_number(&v, key)).transpose()
}

/// Parses Java `.properties` syntax into a key/value map.
fn parse_java_properties(text: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    let mut lines = text.lines();

    while let Some(first) = lines.next() {
        let mut logical = first.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        map.insert(unescape(key)?, unescape(value)?);
    }
    Ok(map)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Splits a logical line at the first unescaped `=`, `:` or whitespace.
fn split_entry(line: &str) -> (&str, &str) {
    let mut end = line.len();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let key = &line[..end];

    let rest = line[end..].trim_start_matches([' ', '\t', '\x0c']);
    let rest = match rest.strip_prefix(['=', ':']) {
        Some(r) => r.trim_start_matches([' ', '\t', '\x0c']),
        None => rest,
    };
    (key, rest)
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| Error::format(format!("malformed \\u escape \\u{hex}")))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}
