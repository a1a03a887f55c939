//! Filter rules: which external command transforms a part before display.

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::config::FilterConfig;
use crate::model::address::format_addresses;
use crate::model::message::MessageInfo;
use crate::model::structure::BodyStructure;

/// Header values a rule can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Subject,
    From,
    To,
    Cc,
}

impl HeaderField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "subject" => Some(Self::Subject),
            "from" => Some(Self::From),
            "to" => Some(Self::To),
            "cc" => Some(Self::Cc),
            _ => None,
        }
    }

    fn value(self, msg: &MessageInfo) -> String {
        match self {
            Self::Subject => msg.envelope.subject.clone(),
            Self::From => format_addresses(&msg.envelope.from),
            Self::To => format_addresses(&msg.envelope.to),
            Self::Cc => format_addresses(&msg.envelope.cc),
        }
    }
}

/// How a rule decides whether it applies.
#[derive(Debug, Clone)]
pub enum FilterMatch {
    /// Glob against the part's `type/subtype`.
    MimeType(GlobMatcher),
    /// Regular expression against a message header.
    Header(HeaderField, Regex),
}

/// A compiled `[[filters]]` entry.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub matcher: FilterMatch,
    /// Shell command; empty means "no transformation".
    pub command: String,
}

impl FilterRule {
    /// Compile one config entry. Errors describe what is wrong with it.
    pub fn compile(cfg: &FilterConfig) -> Result<Self, String> {
        let matcher = match (&cfg.mimetype, &cfg.header, &cfg.regex) {
            (Some(glob), None, None) => {
                let glob = Glob::new(&glob.to_lowercase())
                    .map_err(|e| format!("invalid mimetype glob '{glob}': {e}"))?;
                FilterMatch::MimeType(glob.compile_matcher())
            }
            (None, Some(header), Some(pattern)) => {
                let field = HeaderField::from_name(header)
                    .ok_or_else(|| format!("unsupported filter header '{header}'"))?;
                let regex = Regex::new(pattern)
                    .map_err(|e| format!("invalid regex '{pattern}': {e}"))?;
                FilterMatch::Header(field, regex)
            }
            _ => {
                return Err("a filter needs either `mimetype` or `header` + `regex`".to_string())
            }
        };
        Ok(Self {
            matcher,
            command: cfg.command.trim().to_string(),
        })
    }

    pub fn matches(&self, part: &BodyStructure, msg: &MessageInfo) -> bool {
        match &self.matcher {
            FilterMatch::MimeType(glob) => glob.is_match(part.mime()),
            FilterMatch::Header(field, regex) => regex.is_match(&field.value(msg)),
        }
    }

    /// True when the part goes straight to the pager.
    pub fn is_passthrough(&self) -> bool {
        self.command.is_empty()
    }
}

/// Compile every rule, skipping (and logging) the broken ones.
pub fn compile_filters(configs: &[FilterConfig]) -> Vec<FilterRule> {
    configs
        .iter()
        .enumerate()
        .filter_map(|(i, cfg)| match FilterRule::compile(cfg) {
            Ok(rule) => Some(rule),
            Err(reason) => {
                tracing::warn!(rule = i, %reason, "Ignoring filter rule");
                None
            }
        })
        .collect()
}

/// The first rule that applies to `part`, in configured order.
pub fn match_filter<'a>(
    rules: &'a [FilterRule],
    part: &BodyStructure,
    msg: &MessageInfo,
) -> Option<&'a FilterRule> {
    rules.iter().find(|rule| rule.matches(part, msg))
}
