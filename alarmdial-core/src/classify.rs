//! Maps one received modem line onto the closed response vocabulary.

/// Everything the firmware can tell apart on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseKind {
    Ok,
    Error,
    Cpsi,
    Creg,
    Cpms,
    Csq,
    Cmgd,
    Cmgs,
    Cmti,
    Cmgr,
    Clcc,
    /// Any other `+...` line.
    Unclassified,
}

pub const KIND_COUNT: usize = 12;

impl ResponseKind {
    pub const ALL: [ResponseKind; KIND_COUNT] = [
        ResponseKind::Ok,
        ResponseKind::Error,
        ResponseKind::Cpsi,
        ResponseKind::Creg,
        ResponseKind::Cpms,
        ResponseKind::Csq,
        ResponseKind::Cmgd,
        ResponseKind::Cmgs,
        ResponseKind::Cmti,
        ResponseKind::Cmgr,
        ResponseKind::Clcc,
        ResponseKind::Unclassified,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

const PLUS_PREFIXES: [(&str, ResponseKind); 9] = [
    ("+CPSI", ResponseKind::Cpsi),
    ("+CREG", ResponseKind::Creg),
    ("+CPMS", ResponseKind::Cpms),
    ("+CSQ", ResponseKind::Csq),
    ("+CMGD", ResponseKind::Cmgd),
    ("+CMGS", ResponseKind::Cmgs),
    ("+CMTI", ResponseKind::Cmti),
    ("+CMGR", ResponseKind::Cmgr),
    ("+CLCC", ResponseKind::Clcc),
];

#[derive(Debug, PartialEq, Eq)]
pub enum Classified<'a> {
    Response(ResponseKind, &'a str),
    /// Free-form data, only meaningful while an SMS read-out is in flight.
    Payload(&'a str),
    Ignored,
}

pub fn classify(line: &str) -> Classified<'_> {
    if line.is_empty() || line.starts_with('>') {
        return Classified::Ignored;
    }
    if line == "OK" {
        return Classified::Response(ResponseKind::Ok, line);
    }
    if line == "ERROR" {
        return Classified::Response(ResponseKind::Error, line);
    }
    for (prefix, kind) in PLUS_PREFIXES {
        if line.starts_with(prefix) {
            return Classified::Response(kind, line);
        }
    }
    if line.starts_with('+') {
        return Classified::Response(ResponseKind::Unclassified, line);
    }
    Classified::Payload(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_the_closed_vocabulary() {
        assert_eq!(classify("OK"), Classified::Response(ResponseKind::Ok, "OK"));
        assert_eq!(
            classify("ERROR"),
            Classified::Response(ResponseKind::Error, "ERROR")
        );
        for (line, kind) in [
            ("+CPSI: LTE,Online,234-15", ResponseKind::Cpsi),
            ("+CREG: 0,1", ResponseKind::Creg),
            ("+CPMS: 0,40,0,40,0,40", ResponseKind::Cpms),
            ("+CSQ: 17,99", ResponseKind::Csq),
            ("+CMGD: (1-40)", ResponseKind::Cmgd),
            ("+CMGS: 23", ResponseKind::Cmgs),
            ("+CMTI: \"SM\",5", ResponseKind::Cmti),
            ("+CMGR: \"REC UNREAD\",\"+447700900123\"", ResponseKind::Cmgr),
            ("+CLCC: 1,1,4,0,0,\"+447700900123\",145", ResponseKind::Clcc),
        ] {
            assert_eq!(classify(line), Classified::Response(kind, line));
        }
    }

    #[test]
    fn unknown_plus_lines_keep_their_text() {
        assert_eq!(
            classify("+XYZZY: something"),
            Classified::Response(ResponseKind::Unclassified, "+XYZZY: something")
        );
    }

    #[test]
    fn prompt_and_blank_lines_are_ignored() {
        assert_eq!(classify(""), Classified::Ignored);
        assert_eq!(classify(">"), Classified::Ignored);
        assert_eq!(classify("> "), Classified::Ignored);
    }

    #[test]
    fn anything_else_is_payload() {
        assert_eq!(
            classify("674358 Signal?"),
            Classified::Payload("674358 Signal?")
        );
        // only the exact words count as terminal responses
        assert_eq!(classify("OKAY"), Classified::Payload("OKAY"));
    }
}
