//! Tag and attribute names of the statechart vocabulary,
//! and the per-element attribute schema.

pub const TAG_SCXML: &str = "scxml";
pub const TAG_STATE: &str = "state";
pub const TAG_PARALLEL: &str = "parallel";
pub const TAG_FINAL: &str = "final";
pub const TAG_HISTORY: &str = "history";
pub const TAG_INITIAL: &str = "initial";
pub const TAG_TRANSITION: &str = "transition";
pub const TAG_ONENTRY: &str = "onentry";
pub const TAG_ONEXIT: &str = "onexit";
pub const TAG_DATAMODEL: &str = "datamodel";
pub const TAG_DATA: &str = "data";
pub const TAG_RAISE: &str = "raise";
pub const TAG_SEND: &str = "send";
pub const TAG_PARAM: &str = "param";
pub const TAG_CONTENT: &str = "content";
pub const TAG_IF: &str = "if";
pub const TAG_ELSEIF: &str = "elseif";
pub const TAG_ELSE: &str = "else";
pub const TAG_FOREACH: &str = "foreach";
pub const TAG_LOG: &str = "log";
pub const TAG_ASSIGN: &str = "assign";
pub const TAG_SCRIPT: &str = "script";
pub const TAG_CANCEL: &str = "cancel";
pub const TAG_INVOKE: &str = "invoke";
pub const TAG_FINALIZE: &str = "finalize";
pub const TAG_DONEDATA: &str = "donedata";

pub const ATTR_ID: &str = "id";
pub const ATTR_INITIAL: &str = "initial";
pub const ATTR_NAME: &str = "name";
pub const ATTR_VERSION: &str = "version";
pub const ATTR_XMLNS: &str = "xmlns";
pub const ATTR_DATAMODEL: &str = "datamodel";
pub const ATTR_BINDING: &str = "binding";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_EVENT: &str = "event";
pub const ATTR_EVENTEXPR: &str = "eventexpr";
pub const ATTR_COND: &str = "cond";
pub const ATTR_TARGET: &str = "target";
pub const ATTR_TARGETEXPR: &str = "targetexpr";
pub const ATTR_SRC: &str = "src";
pub const ATTR_SRCEXPR: &str = "srcexpr";
pub const ATTR_EXPR: &str = "expr";
pub const ATTR_LOCATION: &str = "location";
pub const ATTR_LABEL: &str = "label";
pub const ATTR_ARRAY: &str = "array";
pub const ATTR_ITEM: &str = "item";
pub const ATTR_INDEX: &str = "index";
pub const ATTR_TYPEEXPR: &str = "typeexpr";
pub const ATTR_IDLOCATION: &str = "idlocation";
pub const ATTR_DELAY: &str = "delay";
pub const ATTR_DELAYEXPR: &str = "delayexpr";
pub const ATTR_NAMELIST: &str = "namelist";
pub const ATTR_SENDID: &str = "sendid";
pub const ATTR_SENDIDEXPR: &str = "sendidexpr";
pub const ATTR_AUTOFORWARD: &str = "autoforward";

/// Namespace URI expected on the root element.
pub const SCXML_NAMESPACE: &str = "http://www.w3.org/2005/07/scxml";
/// The only supported document version.
pub const SCXML_VERSION: &str = "1.0";

/// Values of the `type` attribute of a transition.
pub const TRANSITION_INTERNAL: &str = "internal";
pub const TRANSITION_EXTERNAL: &str = "external";

/// Values of the `type` attribute of a history pseudo-state.
pub const HISTORY_SHALLOW: &str = "shallow";
pub const HISTORY_DEEP: &str = "deep";

/// Every known tag, i.e., every tag with an attribute schema.
pub const TAGS: &[&str] = &[
    TAG_SCXML,
    TAG_STATE,
    TAG_PARALLEL,
    TAG_FINAL,
    TAG_HISTORY,
    TAG_INITIAL,
    TAG_TRANSITION,
    TAG_ONENTRY,
    TAG_ONEXIT,
    TAG_DATAMODEL,
    TAG_DATA,
    TAG_RAISE,
    TAG_SEND,
    TAG_PARAM,
    TAG_CONTENT,
    TAG_IF,
    TAG_ELSEIF,
    TAG_ELSE,
    TAG_FOREACH,
    TAG_LOG,
    TAG_ASSIGN,
    TAG_SCRIPT,
    TAG_CANCEL,
    TAG_INVOKE,
    TAG_FINALIZE,
    TAG_DONEDATA,
];

/// Tags registered as states in the hierarchy.
pub const STATE_TAGS: &[&str] = &[TAG_STATE, TAG_PARALLEL, TAG_FINAL, TAG_HISTORY];

/// Legal attributes of the given tag, or `None` for an unknown tag.
pub fn allowed_attributes(tag: &str) -> Option<&'static [&'static str]> {
    let attrs: &'static [&'static str] = match tag {
        TAG_SCXML => &[
            ATTR_INITIAL,
            ATTR_NAME,
            ATTR_XMLNS,
            ATTR_VERSION,
            ATTR_DATAMODEL,
            ATTR_BINDING,
        ],
        TAG_STATE => &[ATTR_ID, ATTR_INITIAL],
        TAG_PARALLEL | TAG_FINAL => &[ATTR_ID],
        TAG_HISTORY => &[ATTR_ID, ATTR_TYPE],
        TAG_TRANSITION => &[ATTR_EVENT, ATTR_COND, ATTR_TARGET, ATTR_TYPE],
        TAG_DATA => &[ATTR_ID, ATTR_SRC, ATTR_EXPR],
        TAG_RAISE => &[ATTR_EVENT],
        TAG_SEND => &[
            ATTR_EVENT,
            ATTR_EVENTEXPR,
            ATTR_TARGET,
            ATTR_TARGETEXPR,
            ATTR_TYPE,
            ATTR_TYPEEXPR,
            ATTR_ID,
            ATTR_IDLOCATION,
            ATTR_DELAY,
            ATTR_DELAYEXPR,
            ATTR_NAMELIST,
        ],
        TAG_PARAM => &[ATTR_NAME, ATTR_EXPR, ATTR_LOCATION],
        TAG_CONTENT => &[ATTR_EXPR],
        TAG_IF | TAG_ELSEIF => &[ATTR_COND],
        TAG_FOREACH => &[ATTR_ARRAY, ATTR_ITEM, ATTR_INDEX],
        TAG_LOG => &[ATTR_LABEL, ATTR_EXPR],
        TAG_ASSIGN => &[ATTR_LOCATION, ATTR_EXPR],
        TAG_SCRIPT => &[ATTR_SRC],
        TAG_CANCEL => &[ATTR_SENDID, ATTR_SENDIDEXPR],
        TAG_INVOKE => &[
            ATTR_TYPE,
            ATTR_TYPEEXPR,
            ATTR_SRC,
            ATTR_SRCEXPR,
            ATTR_ID,
            ATTR_IDLOCATION,
            ATTR_NAMELIST,
            ATTR_AUTOFORWARD,
        ],
        TAG_INITIAL | TAG_ONENTRY | TAG_ONEXIT | TAG_DATAMODEL | TAG_ELSE | TAG_FINALIZE
        | TAG_DONEDATA => &[],
        _ => return None,
    };
    Some(attrs)
}

/// Whether an attribute name is foreign to the vocabulary and always accepted.
pub fn is_foreign_attribute(name: &str) -> bool {
    name.contains(':') || name == ATTR_XMLNS || name.starts_with("xmlns")
}

/// Whether a tag name belongs to a foreign namespace.
pub fn is_foreign_tag(name: &str) -> bool {
    name.contains(':')
}

/// An attribute requirement of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The attribute must be present.
    All(&'static str),
    /// At least one of the attributes must be present.
    AnyOf(&'static [&'static str]),
}

impl Requirement {
    /// Human-readable description of what is required.
    pub fn describe(&self) -> String {
        match self {
            Requirement::All(attr) => format!("'{attr}'"),
            Requirement::AnyOf(attrs) => attrs
                .iter()
                .map(|attr| format!("'{attr}'"))
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }
}

/// Unconditional attribute requirements of the given tag.
///
/// The conditional requirement of `target` on a transition
/// (not required when `type="internal"`) is handled separately.
/// State ids are required too, but their absence is reported while building the hierarchy.
pub fn required_attributes(tag: &str) -> &'static [Requirement] {
    match tag {
        TAG_DATA => &[Requirement::All(ATTR_ID)],
        TAG_SEND => &[Requirement::AnyOf(&[ATTR_EVENT, ATTR_EVENTEXPR])],
        TAG_RAISE => &[Requirement::All(ATTR_EVENT)],
        TAG_IF | TAG_ELSEIF => &[Requirement::All(ATTR_COND)],
        TAG_FOREACH => &[Requirement::All(ATTR_ITEM), Requirement::All(ATTR_ARRAY)],
        TAG_ASSIGN => &[Requirement::All(ATTR_LOCATION)],
        TAG_CANCEL => &[Requirement::AnyOf(&[ATTR_SENDID, ATTR_SENDIDEXPR])],
        TAG_PARAM => &[Requirement::All(ATTR_NAME)],
        _ => &[],
    }
}

/// A short remediation hint for a missing requirement.
pub fn remediation(tag: &str) -> &'static str {
    match tag {
        TAG_TRANSITION => "add a 'target' attribute, or declare type=\"internal\"",
        TAG_DATA => "give the data item an 'id' so it can be referenced",
        TAG_SEND => "name the event to send with 'event' or compute it with 'eventexpr'",
        TAG_RAISE => "name the event to raise with 'event'",
        TAG_IF | TAG_ELSEIF => "add a 'cond' expression",
        TAG_FOREACH => "declare both the 'array' to iterate and the 'item' variable",
        TAG_ASSIGN => "declare the 'location' to assign to",
        TAG_CANCEL => "reference the send to cancel with 'sendid' or 'sendidexpr'",
        TAG_PARAM => "name the parameter with 'name'",
        _ => "add the missing attribute",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_has_a_schema() {
        for tag in TAGS {
            assert!(allowed_attributes(tag).is_some(), "{tag} has no schema");
        }
        assert!(allowed_attributes("stat").is_none());
    }

    #[test]
    fn required_attributes_are_allowed() {
        for tag in TAGS {
            let allowed = allowed_attributes(tag).expect("known tag");
            for requirement in required_attributes(tag) {
                match requirement {
                    Requirement::All(attr) => assert!(allowed.contains(attr)),
                    Requirement::AnyOf(attrs) => {
                        assert!(attrs.iter().all(|attr| allowed.contains(attr)))
                    }
                }
            }
        }
    }

    #[test]
    fn foreign_names() {
        assert!(is_foreign_attribute("conf:type"));
        assert!(is_foreign_attribute("xmlns:conf"));
        assert!(!is_foreign_attribute("initial"));
        assert!(is_foreign_tag("conf:bt"));
    }

    #[test]
    fn describe_requirement() {
        assert_eq!(Requirement::All(ATTR_EVENT).describe(), "'event'");
        assert_eq!(
            Requirement::AnyOf(&[ATTR_EVENT, ATTR_EVENTEXPR]).describe(),
            "'event' or 'eventexpr'"
        );
    }
}
