//! Log-line parsing into traces
//!
//! Each line is matched against the configured regular expressions in order;
//! the first match wins. Named groups:
//!
//! - `TYPE` (required): the event type. `S->D!m` (or `S->D#N!m`) denotes a
//!   send of `m` from process `S` to `D` on channel `S->D#N` (`N` defaults
//!   to 0), `S->D?m` the matching receive.
//! - `TIME` (optional): integer timestamp
//! - `PID` (optional): owning process of a local event (default 0)
//!
//! The partition mapping decides which trace a line belongs to: every
//! `\k<NAME>` in it is replaced by the line's `NAME` group (`FILE` is the
//! log file name), and lines with equal keys form one trace. The default
//! `\k<FILE>` gives one trace per file. A line matching the separator
//! expression closes every open trace.

use crate::channel::ChannelId;
use crate::trace::{Event, ProcessId, Trace, TraceSet};
use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Expression used when none is configured: the whole line is the type
pub const DEFAULT_REGEX: &str = r"(?<TYPE>.*)";

/// Mapping used when none is configured: one trace per file
pub const DEFAULT_PARTITION_MAPPING: &str = r"\k<FILE>";

const CHANNEL_SYNTAX: &str = r"^(?<src>\d+)->(?<dst>\d+)(?:#(?<id>\d+))?(?<op>[!?])(?<msg>.+)$";

const FILE_FIELD: &str = "FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyPart {
    Literal(String),
    Field(String),
}

/// Compiled partition-mapping template
#[derive(Debug, Clone)]
struct PartitionMapping {
    parts: Vec<KeyPart>,
}

impl PartitionMapping {
    fn parse(template: &str) -> Result<Self> {
        let reference = Regex::new(r"\\k<(\w+)>").context("Invalid back-reference syntax")?;
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in reference.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                parts.push(KeyPart::Literal(template[last..whole.start()].to_string()));
            }
            parts.push(KeyPart::Field(name.as_str().to_string()));
            last = whole.end();
        }
        if last < template.len() {
            parts.push(KeyPart::Literal(template[last..].to_string()));
        }
        Ok(Self { parts })
    }

    fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().filter_map(|part| match part {
            KeyPart::Field(name) => Some(name.as_str()),
            KeyPart::Literal(_) => None,
        })
    }

    /// Trace key of a matched line; missing groups contribute nothing
    fn key(&self, file: &str, caps: &Captures<'_>) -> String {
        let mut key = String::new();
        for part in &self.parts {
            match part {
                KeyPart::Literal(text) => key.push_str(text),
                KeyPart::Field(name) if name == FILE_FIELD => key.push_str(file),
                KeyPart::Field(name) => {
                    if let Some(value) = caps.name(name) {
                        key.push_str(value.as_str());
                    }
                }
            }
        }
        key
    }
}

/// Events grouped by trace key, in order of first appearance
#[derive(Debug, Default)]
struct TraceGroups {
    /// Separator lines seen so far; part of every key
    epoch: usize,
    index: HashMap<(usize, String), usize>,
    traces: Vec<Vec<Event>>,
}

impl TraceGroups {
    fn separate(&mut self) {
        self.epoch += 1;
    }

    fn push(&mut self, key: String, event: Event) {
        let fresh = self.traces.len();
        let slot = *self.index.entry((self.epoch, key)).or_insert(fresh);
        if slot == fresh {
            self.traces.push(Vec::new());
        }
        self.traces[slot].push(event);
    }

    fn finish(self) -> Vec<Trace> {
        self.traces.into_iter().map(Trace::new).collect()
    }
}

#[derive(Debug, Clone)]
pub struct LogParser {
    regexes: Vec<Regex>,
    channel: Regex,
    separator: Option<Regex>,
    mapping: PartitionMapping,
    ignore_non_matching: bool,
    ignore_parse_errors: bool,
}

impl LogParser {
    /// Compile the line expressions; an empty list selects [`DEFAULT_REGEX`]
    pub fn new<S: AsRef<str>>(
        patterns: &[S],
        separator: Option<&str>,
        ignore_non_matching: bool,
    ) -> Result<Self> {
        let mut regexes = Vec::with_capacity(patterns.len().max(1));
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern)
                .with_context(|| format!("Invalid regular expression: {pattern}"))?;
            if !regex.capture_names().flatten().any(|name| name == "TYPE") {
                bail!("Regular expression has no TYPE group: {}", pattern);
            }
            regexes.push(regex);
        }
        if regexes.is_empty() {
            regexes.push(Regex::new(DEFAULT_REGEX).context("Invalid default expression")?);
        }
        let separator = separator
            .map(|s| Regex::new(s).with_context(|| format!("Invalid separator expression: {s}")))
            .transpose()?;

        Ok(Self {
            regexes,
            channel: Regex::new(CHANNEL_SYNTAX).context("Invalid channel syntax expression")?,
            separator,
            mapping: PartitionMapping::parse(DEFAULT_PARTITION_MAPPING)?,
            ignore_non_matching,
            ignore_parse_errors: false,
        })
    }

    /// Group lines into traces by `template` instead of by file
    ///
    /// Every `\k<NAME>` must name `FILE` or a group of some line expression.
    pub fn with_partition_mapping(mut self, template: &str) -> Result<Self> {
        let mapping = PartitionMapping::parse(template)?;
        for field in mapping.fields() {
            let known = field == FILE_FIELD
                || self
                    .regexes
                    .iter()
                    .any(|re| re.capture_names().flatten().any(|name| name == field));
            if !known {
                bail!("Partition mapping refers to unknown group {}: {}", field, template);
            }
        }
        self.mapping = mapping;
        Ok(self)
    }

    /// Skip lines whose groups do not parse (bad TIME, PID or process ids)
    /// instead of failing
    pub fn with_ignore_parse_errors(mut self, ignore: bool) -> Self {
        self.ignore_parse_errors = ignore;
        self
    }

    /// Parse one log's contents; `FILE` keys are empty
    ///
    /// Blank lines are skipped; runs of separators do not produce empty
    /// traces.
    pub fn parse_str(&self, input: &str) -> Result<Vec<Trace>> {
        let mut groups = TraceGroups::default();
        self.parse_into(&mut groups, "", input)?;
        Ok(groups.finish())
    }

    /// Parse every file into one trace set
    pub fn parse_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<TraceSet> {
        let mut groups = TraceGroups::default();
        for path in paths {
            let path = path.as_ref();
            let input = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read log file {}", path.display()))?;
            self.parse_into(&mut groups, &path.display().to_string(), &input)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
        }
        let traces = TraceSet::new(groups.finish());
        info!(
            files = paths.len(),
            traces = traces.len(),
            events = traces.event_count(),
            "parsed logs"
        );
        Ok(traces)
    }

    /// One line per input line: the extracted groups and the trace key
    pub fn debug_lines(&self, file: &str, input: &str) -> Vec<String> {
        let mut report = Vec::new();
        for (index, line) in input.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if self.separator.as_ref().is_some_and(|sep| sep.is_match(line)) {
                report.push(format!("{}:{}: separator", file, index + 1));
                continue;
            }
            let Some((regex, caps)) = self.match_line(line) else {
                report.push(format!("{}:{}: no match: {}", file, index + 1, line));
                continue;
            };
            let fields: Vec<String> = regex
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| format!("{}={}", name, m.as_str())))
                .collect();
            let status = match self.event_from(&caps) {
                Ok(event) => format!("event {event}"),
                Err(err) => format!("error: {err:#}"),
            };
            report.push(format!(
                "{}:{}: {} [trace '{}'] {}",
                file,
                index + 1,
                fields.join(" "),
                self.mapping.key(file, &caps),
                status
            ));
        }
        report
    }

    /// [`Self::debug_lines`] over every file
    pub fn debug_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<String>> {
        let mut report = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let input = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read log file {}", path.display()))?;
            report.extend(self.debug_lines(&path.display().to_string(), &input));
        }
        Ok(report)
    }

    fn parse_into(&self, groups: &mut TraceGroups, file: &str, input: &str) -> Result<()> {
        for (index, line) in input.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if self.separator.as_ref().is_some_and(|sep| sep.is_match(line)) {
                groups.separate();
                continue;
            }
            let Some((_, caps)) = self.match_line(line) else {
                if self.ignore_non_matching {
                    warn!(line = index + 1, text = line, "skipping non-matching line");
                    continue;
                }
                bail!(
                    "line {} does not match any regular expression: {}",
                    index + 1,
                    line
                );
            };
            let event = match self
                .event_from(&caps)
                .with_context(|| format!("line {}", index + 1))
            {
                Ok(event) => event,
                Err(err) if self.ignore_parse_errors => {
                    warn!(line = index + 1, error = %format!("{err:#}"), "skipping unparsable line");
                    continue;
                }
                Err(err) => return Err(err),
            };
            groups.push(self.mapping.key(file, &caps), event);
        }
        Ok(())
    }

    fn match_line<'l>(&self, line: &'l str) -> Option<(&Regex, Captures<'l>)> {
        self.regexes.iter().find_map(|re| {
            re.captures(line)
                .filter(|caps| caps.name("TYPE").is_some())
                .map(|caps| (re, caps))
        })
    }

    fn event_from(&self, caps: &Captures<'_>) -> Result<Event> {
        let label = caps.name("TYPE").map_or("", |m| m.as_str());

        let mut event = match self.channel.captures(label) {
            Some(chan) => {
                let src: ProcessId = chan["src"].parse().context("Invalid source process")?;
                let dst: ProcessId = chan["dst"].parse().context("Invalid destination process")?;
                let instance: u32 = match chan.name("id") {
                    Some(id) => id.as_str().parse().context("Invalid channel number")?,
                    None => 0,
                };
                let channel = ChannelId::new(src, dst, instance);
                let message = &chan["msg"];
                if &chan["op"] == "!" {
                    Event::send(message, channel)
                } else {
                    Event::recv(message, channel)
                }
            }
            None => {
                let process = match caps.name("PID") {
                    Some(pid) => pid
                        .as_str()
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid PID: {}", pid.as_str()))?,
                    None => 0,
                };
                Event::local(label, process)
            }
        };

        if let Some(time) = caps.name("TIME") {
            let time: i64 = time
                .as_str()
                .trim()
                .parse()
                .with_context(|| format!("Invalid TIME: {}", time.as_str()))?;
            event = event.with_time(time);
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{EventKind, EventType};
    use std::io::Write;

    fn default_parser() -> LogParser {
        LogParser::new::<&str>(&[], None, false).unwrap()
    }

    fn labels(trace: &Trace) -> Vec<&str> {
        trace.labels().map(EventType::as_str).collect()
    }

    #[test]
    fn test_default_regex_whole_line() {
        let parser = default_parser();
        let traces = parser.parse_str("open\nread\n\nclose\n").unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(labels(&traces[0]), ["open", "read", "close"]);
    }

    #[test]
    fn test_separator_splits_traces() {
        let parser = LogParser::new::<&str>(&[], Some("^--$"), false).unwrap();
        let traces = parser.parse_str("a\nb\n--\n--\nc\n").unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(labels(&traces[1]), ["c"]);
    }

    #[test]
    fn test_named_groups() {
        let parser =
            LogParser::new(&[r"^(?<TIME>\d+) p(?<PID>\d+) (?<TYPE>\w+)$"], None, false).unwrap();
        let traces = parser.parse_str("10 p2 start\n15 p2 stop\n").unwrap();
        let events = traces[0].events();
        assert_eq!(events[0].process, 2);
        assert_eq!(events[0].time, Some(10));
        assert_eq!(events[1].label, EventType::from("stop"));
    }

    #[test]
    fn test_first_matching_regex_wins() {
        let parser = LogParser::new(&[r"^ERR (?<TYPE>\w+)", r"^(?<TYPE>\w+)"], None, false).unwrap();
        let traces = parser.parse_str("ERR disk\nboot\n").unwrap();
        assert_eq!(labels(&traces[0]), ["disk", "boot"]);
    }

    #[test]
    fn test_channel_syntax() {
        let parser = default_parser();
        let traces = parser.parse_str("0->1!req\n0->1?req\n").unwrap();
        let events = traces[0].events();
        let channel = ChannelId::new(0, 1, 0);
        assert_eq!(events[0].kind, EventKind::Send(channel));
        assert_eq!(events[0].process, 0);
        assert_eq!(events[1].kind, EventKind::Recv(channel));
        assert_eq!(events[1].process, 1);
        assert_eq!(events[1].label, EventType::from("req"));
    }

    #[test]
    fn test_numbered_channels() {
        let parser = default_parser();
        let traces = parser.parse_str("2->0#3!ack\n2->0#3?ack\n2->0!ack\n").unwrap();
        let events = traces[0].events();
        assert_eq!(events[0].kind, EventKind::Send(ChannelId::new(2, 0, 3)));
        assert_eq!(events[1].kind, EventKind::Recv(ChannelId::new(2, 0, 3)));
        assert_eq!(events[1].process, 0);
        assert_eq!(events[2].kind, EventKind::Send(ChannelId::new(2, 0, 0)));
        // a malformed channel number is an ordinary local label
        let traces = parser.parse_str("0->1#x!m\n").unwrap();
        assert_eq!(traces[0].events()[0].kind, EventKind::Local);
    }

    #[test]
    fn test_partition_mapping_groups_lines_by_field() {
        let parser = LogParser::new(&[r"^(?<ID>\d+) (?<TYPE>\w+)$"], None, false)
            .unwrap()
            .with_partition_mapping(r"\k<ID>")
            .unwrap();
        let traces = parser
            .parse_str("1 open\n2 open\n1 read\n2 close\n1 close\n")
            .unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(labels(&traces[0]), ["open", "read", "close"]);
        assert_eq!(labels(&traces[1]), ["open", "close"]);
    }

    #[test]
    fn test_partition_mapping_spans_files() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "a open\nb open").unwrap();
        writeln!(second, "a close\nb close").unwrap();
        let paths = [first.path(), second.path()];
        let regex = [r"^(?<SID>\w) (?<TYPE>\w+)$"];

        let by_session = LogParser::new(&regex, None, false)
            .unwrap()
            .with_partition_mapping(r"s-\k<SID>")
            .unwrap();
        let traces = by_session.parse_files(&paths).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(labels(&traces.traces()[0]), ["open", "close"]);

        let by_file_and_session = LogParser::new(&regex, None, false)
            .unwrap()
            .with_partition_mapping(r"\k<FILE>/\k<SID>")
            .unwrap();
        assert_eq!(by_file_and_session.parse_files(&paths).unwrap().len(), 4);
    }

    #[test]
    fn test_separator_splits_mapped_traces() {
        let parser = LogParser::new(&[r"^(?<ID>\d+) (?<TYPE>\w+)$"], Some("^--$"), false)
            .unwrap()
            .with_partition_mapping(r"\k<ID>")
            .unwrap();
        let traces = parser.parse_str("1 a\n--\n1 b\n").unwrap();
        assert_eq!(traces.len(), 2);
    }

    #[test]
    fn test_partition_mapping_unknown_group_rejected() {
        let err = default_parser().with_partition_mapping(r"\k<SESSION>").unwrap_err();
        assert!(err.to_string().contains("SESSION"));
        assert!(default_parser().with_partition_mapping("fixed").is_ok());
    }

    #[test]
    fn test_ignore_parse_errors() {
        let pattern = [r"^(?<TIME>\S+) (?<TYPE>\w+)$"];
        let input = "1 start\nsoon go\n7 stop\n";
        let strict = LogParser::new(&pattern, None, false).unwrap();
        assert!(strict.parse_str(input).is_err());

        let lenient = strict.with_ignore_parse_errors(true);
        let traces = lenient.parse_str(input).unwrap();
        assert_eq!(labels(&traces[0]), ["start", "stop"]);
        assert_eq!(traces[0].events()[1].time, Some(7));
    }

    #[test]
    fn test_debug_lines_show_fields_and_key() {
        let parser = LogParser::new(&[r"^(?<TIME>\S+) (?<TYPE>\w+)$"], Some("^--$"), false)
            .unwrap();
        let report = parser.debug_lines("app.log", "5 open\n--\nnoise\nlater x\n");
        assert_eq!(report.len(), 4);
        assert_eq!(report[0], "app.log:1: TIME=5 TYPE=open [trace 'app.log'] event p0:open");
        assert_eq!(report[1], "app.log:2: separator");
        assert!(report[2].contains("no match"));
        assert!(report[3].contains("Invalid TIME"));
    }

    #[test]
    fn test_non_matching_lines() {
        let strict = LogParser::new(&[r"^ev (?<TYPE>\w+)$"], None, false).unwrap();
        let err = strict.parse_str("ev a\nnoise\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let lenient = LogParser::new(&[r"^ev (?<TYPE>\w+)$"], None, true).unwrap();
        let traces = lenient.parse_str("ev a\nnoise\nev b\n").unwrap();
        assert_eq!(labels(&traces[0]), ["a", "b"]);
    }

    #[test]
    fn test_regex_without_type_group_rejected() {
        assert!(LogParser::new(&[r"^(?<NAME>\w+)$"], None, false).is_err());
        assert!(LogParser::new(&[r"("], None, false).is_err());
    }

    #[test]
    fn test_invalid_time_reported() {
        let parser = LogParser::new(&[r"^(?<TIME>\S+) (?<TYPE>\w+)$"], None, false).unwrap();
        let err = parser.parse_str("soon go\n").unwrap_err();
        assert!(format!("{err:#}").contains("Invalid TIME"));
    }

    #[test]
    fn test_parse_files_one_trace_per_file() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "a\nb").unwrap();
        writeln!(second, "a\nc").unwrap();

        let parser = default_parser();
        let traces = parser.parse_files(&[first.path(), second.path()]).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces.event_count(), 4);

        assert!(parser.parse_files(&[Path::new("/nonexistent/log")]).is_err());
    }
}
