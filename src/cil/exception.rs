use crate::util::Offset;
use serde::Deserialize;
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Catch,
    Filter,
    Finally,
    Fault,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandlerKind::Catch => "catch",
            HandlerKind::Filter => "filter",
            HandlerKind::Finally => "finally",
            HandlerKind::Fault => "fault",
        })
    }
}

/// Protected region of a method body and its handler
///
/// Ranges are half open: `try_start <= offset < try_end`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionRegion {
    pub kind: HandlerKind,
    pub try_start: Offset,
    pub try_end: Offset,
    pub handler_start: Offset,
    pub handler_end: Offset,

    /// Start of the filter block (only for [`HandlerKind::Filter`])
    pub filter_start: Option<Offset>,

    /// Caught exception type (only for [`HandlerKind::Catch`])
    pub catch_type: Option<String>,
}

impl ExceptionRegion {
    /// Evaluation stack depth on entry to the handler
    ///
    /// The runtime pushes the exception object before entering a catch handler or a filter.
    /// `finally` and `fault` handlers start with an empty stack.
    pub fn handler_entry_depth(&self) -> usize {
        match self.kind {
            HandlerKind::Catch | HandlerKind::Filter => 1,
            HandlerKind::Finally | HandlerKind::Fault => 0,
        }
    }

    /// Offsets at which the runtime may transfer control into this region's code, paired with
    /// the stack depth at that point
    pub fn entry_points(&self) -> Vec<(Offset, usize)> {
        let mut entries = vec![(self.handler_start, self.handler_entry_depth())];
        if let Some(filter_start) = self.filter_start {
            entries.push((filter_start, 1));
        }
        entries
    }

    /// Offsets that must start a new basic block
    pub fn boundaries(&self) -> Vec<Offset> {
        let mut boundaries = vec![
            self.try_start,
            self.try_end,
            self.handler_start,
            self.handler_end,
        ];
        boundaries.extend(self.filter_start);
        boundaries
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn region(kind: HandlerKind) -> ExceptionRegion {
        ExceptionRegion {
            kind,
            try_start: Offset(0),
            try_end: Offset(6),
            handler_start: Offset(6),
            handler_end: Offset(11),
            filter_start: None,
            catch_type: None,
        }
    }

    #[test]
    fn entry_depths() {
        assert_eq!(region(HandlerKind::Catch).handler_entry_depth(), 1);
        assert_eq!(region(HandlerKind::Finally).handler_entry_depth(), 0);
        assert_eq!(region(HandlerKind::Fault).handler_entry_depth(), 0);

        let mut filter = region(HandlerKind::Filter);
        filter.filter_start = Some(Offset(3));
        assert_eq!(
            filter.entry_points(),
            vec![(Offset(6), 1), (Offset(3), 1)]
        );
    }
}
