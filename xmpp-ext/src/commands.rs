//! Ad-Hoc Commands (XEP-0050): the minimal `<command/>` envelope the
//! gateway answers with when a client walks its `disco#items` node list.

use icq_xml::Element;

/// The ad-hoc commands namespace.
pub const NS_COMMANDS: &str = "http://jabber.org/protocol/commands";

/// The lifecycle state of a multi-stage command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The command is awaiting further input.
    Executing,
    /// The command has finished.
    Completed,
    /// The command was cancelled, by either side.
    Canceled,
}

impl CommandStatus {
    fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Executing => "executing",
            CommandStatus::Completed => "completed",
            CommandStatus::Canceled => "canceled",
        }
    }

    fn from_str(s: &str) -> Option<CommandStatus> {
        match s {
            "executing" => Some(CommandStatus::Executing),
            "completed" => Some(CommandStatus::Completed),
            "canceled" => Some(CommandStatus::Canceled),
            _ => None,
        }
    }
}

/// The action requested by the command's sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Execute the command, starting a new session if needed.
    Execute,
    /// Cancel an in-progress session.
    Cancel,
    /// Complete the command using the data provided so far.
    Complete,
    /// Move to the next stage.
    Next,
    /// Move to the previous stage.
    Prev,
}

impl CommandAction {
    fn as_str(self) -> &'static str {
        match self {
            CommandAction::Execute => "execute",
            CommandAction::Cancel => "cancel",
            CommandAction::Complete => "complete",
            CommandAction::Next => "next",
            CommandAction::Prev => "prev",
        }
    }

    fn from_str(s: &str) -> Option<CommandAction> {
        match s {
            "execute" => Some(CommandAction::Execute),
            "cancel" => Some(CommandAction::Cancel),
            "complete" => Some(CommandAction::Complete),
            "next" => Some(CommandAction::Next),
            "prev" => Some(CommandAction::Prev),
            _ => None,
        }
    }
}

/// A `<command xmlns='http://jabber.org/protocol/commands'/>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The command's disco node, identifying which command this is.
    pub node: String,
    /// Identifies a multi-stage execution; absent on the first request.
    pub session_id: Option<String>,
    /// Present on a response, absent on a request.
    pub status: Option<CommandStatus>,
    /// Present on a request, absent on a response.
    pub action: Option<CommandAction>,
    /// A nested payload, typically a data form.
    pub payload: Option<Element>,
}

impl Command {
    /// Builds a bare request to execute `node` for the first time.
    pub fn execute(node: &str) -> Command {
        Command {
            node: node.to_owned(),
            session_id: None,
            status: None,
            action: Some(CommandAction::Execute),
            payload: None,
        }
    }

    /// Parses a `<command/>` element.
    pub fn from_element(el: &Element) -> Option<Command> {
        if !el.is("command", NS_COMMANDS) {
            return None;
        }
        Some(Command {
            node: el.attr("node")?.to_owned(),
            session_id: el.attr("sessionid").map(str::to_owned),
            status: el.attr("status").and_then(CommandStatus::from_str),
            action: el.attr("action").and_then(CommandAction::from_str),
            payload: el.children().next().cloned(),
        })
    }

    /// Renders this command as a `<command/>` element.
    pub fn to_element(&self) -> Element {
        let mut builder = Element::builder("command", NS_COMMANDS).attr("node", self.node.clone());
        if let Some(session_id) = &self.session_id {
            builder = builder.attr("sessionid", session_id.clone());
        }
        if let Some(status) = self.status {
            builder = builder.attr("status", status.as_str());
        }
        if let Some(action) = self.action {
            builder = builder.attr("action", action.as_str());
        }
        if let Some(payload) = &self.payload {
            builder = builder.append(payload.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_request_roundtrips() {
        let cmd = Command::execute("list-contacts");
        let parsed = Command::from_element(&cmd.to_element()).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn response_carries_session_id_and_status() {
        let cmd = Command {
            node: "list-contacts".into(),
            session_id: Some("abc123".into()),
            status: Some(CommandStatus::Completed),
            action: None,
            payload: None,
        };
        let parsed = Command::from_element(&cmd.to_element()).unwrap();
        assert_eq!(parsed.status, Some(CommandStatus::Completed));
        assert_eq!(parsed.session_id.as_deref(), Some("abc123"));
    }
}
