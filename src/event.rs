//! Typed event sinks.
//!
//! Every event kind keeps its own ordered list of callbacks; registration
//! appends and firing walks the list in registration order. Callbacks get
//! mutable access to the [`Connection`] so they can reply, join, or inspect
//! tracked state; event payloads are snapshots taken when the triggering
//! state transition completed.
//!
//! `on_nick_in_use` is the one short-circuiting protocol: handlers run in
//! order until one returns `true` ("handled", usually after picking a new
//! nick); if none does, the engine disconnects.

use crate::client::Connection;
use crate::user::IrcUser;

pub type ConnectHandler = Box<dyn FnMut(&mut Connection)>;
pub type MessageHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str, &str)>;
pub type CtcpHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str, &str, Option<&str>)>;
pub type JoinHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str)>;
pub type ChannelHandler = Box<dyn FnMut(&mut Connection, &str)>;
pub type JoinThrottleHandler = Box<dyn FnMut(&mut Connection, &str, u64)>;
pub type QuitHandler = Box<dyn FnMut(&mut Connection, &IrcUser, Option<&str>)>;
pub type KickHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str, &str, Option<&str>)>;
pub type ModeHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str, &str, &[String])>;
pub type NickChangeHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str)>;
pub type NickInUseHandler = Box<dyn FnMut(&mut Connection, &str) -> bool>;
pub type InviteHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str, &str)>;
pub type TextHandler = Box<dyn FnMut(&mut Connection, &str)>;
pub type NameListHandler = Box<dyn FnMut(&mut Connection, &str, &[String])>;
pub type TopicHandler = Box<dyn FnMut(&mut Connection, &str, &str)>;
pub type TopicChangeHandler = Box<dyn FnMut(&mut Connection, &IrcUser, &str, &str)>;
pub type TopicInfoHandler = Box<dyn FnMut(&mut Connection, &str, &str, &str)>;
pub type WhoisUserHandler = Box<dyn FnMut(&mut Connection, &IrcUser)>;
pub type WhoisTextHandler = Box<dyn FnMut(&mut Connection, &str, &str)>;
pub type WhoisServerHandler = Box<dyn FnMut(&mut Connection, &str, &str, &str)>;
pub type WhoisIdleHandler = Box<dyn FnMut(&mut Connection, &str, u64)>;
pub type WhoisChannelsHandler = Box<dyn FnMut(&mut Connection, &str, &[String])>;
pub type NickHandler = Box<dyn FnMut(&mut Connection, &str)>;

/// A dispatched event, carrying owned snapshots of the state it reports.
#[derive(Clone, Debug)]
pub(crate) enum Event {
    Connect,
    Message {
        from: IrcUser,
        target: String,
        text: String,
    },
    Notice {
        from: IrcUser,
        target: String,
        text: String,
    },
    CtcpQuery {
        from: IrcUser,
        target: String,
        tag: String,
        message: Option<String>,
    },
    CtcpReply {
        from: IrcUser,
        target: String,
        tag: String,
        message: Option<String>,
    },
    Join {
        user: IrcUser,
        channel: String,
    },
    SuccessfulJoin {
        channel: String,
    },
    JoinTooSoon {
        channel: String,
        seconds: u64,
    },
    Part {
        user: IrcUser,
        channel: String,
    },
    Quit {
        user: IrcUser,
        message: Option<String>,
    },
    Kick {
        kicker: IrcUser,
        channel: String,
        kicked: String,
        reason: Option<String>,
    },
    Mode {
        user: IrcUser,
        target: String,
        modes: String,
        args: Vec<String>,
    },
    NickChange {
        user: IrcUser,
        new_nick: String,
    },
    NickInUse {
        nick: String,
    },
    Invite {
        sender: IrcUser,
        target: String,
        channel: String,
    },
    MotdStart {
        text: String,
    },
    MotdLine {
        text: String,
    },
    MotdEnd {
        text: String,
    },
    NameList {
        channel: String,
        nicks: Vec<String>,
    },
    NameListEnd {
        channel: String,
    },
    Topic {
        channel: String,
        topic: String,
    },
    TopicChange {
        user: IrcUser,
        channel: String,
        topic: String,
    },
    TopicInfo {
        channel: String,
        setter: String,
        time: String,
    },
    WhoisReply {
        user: IrcUser,
    },
    WhoisServer {
        nick: String,
        server: String,
        info: String,
    },
    WhoisOperator {
        nick: String,
        text: String,
    },
    WhoisIdle {
        nick: String,
        seconds: u64,
    },
    WhoisChannels {
        nick: String,
        channels: Vec<String>,
    },
    WhoisAccount {
        nick: String,
        account: String,
    },
    WhoisRegistered {
        nick: String,
        text: String,
    },
    WhoisEnd {
        nick: String,
    },
}

/// Registered callbacks, one ordered list per event kind.
#[derive(Default)]
pub struct Events {
    connect: Vec<ConnectHandler>,
    message: Vec<MessageHandler>,
    notice: Vec<MessageHandler>,
    ctcp_query: Vec<CtcpHandler>,
    ctcp_reply: Vec<CtcpHandler>,
    join: Vec<JoinHandler>,
    successful_join: Vec<ChannelHandler>,
    join_too_soon: Vec<JoinThrottleHandler>,
    part: Vec<JoinHandler>,
    quit: Vec<QuitHandler>,
    kick: Vec<KickHandler>,
    mode: Vec<ModeHandler>,
    nick_change: Vec<NickChangeHandler>,
    nick_in_use: Vec<NickInUseHandler>,
    invite: Vec<InviteHandler>,
    motd_start: Vec<TextHandler>,
    motd_line: Vec<TextHandler>,
    motd_end: Vec<TextHandler>,
    name_list: Vec<NameListHandler>,
    name_list_end: Vec<ChannelHandler>,
    topic: Vec<TopicHandler>,
    topic_change: Vec<TopicChangeHandler>,
    topic_info: Vec<TopicInfoHandler>,
    whois_reply: Vec<WhoisUserHandler>,
    whois_server_reply: Vec<WhoisServerHandler>,
    whois_operator_reply: Vec<WhoisTextHandler>,
    whois_idle_reply: Vec<WhoisIdleHandler>,
    whois_channels_reply: Vec<WhoisChannelsHandler>,
    whois_account_reply: Vec<WhoisTextHandler>,
    whois_registered_reply: Vec<WhoisTextHandler>,
    whois_end: Vec<NickHandler>,
}

/// Generates one appending registration method per event kind.
macro_rules! register {
    ($($(#[$doc:meta])* $name:ident: $field:ident => ($($ty:ty),*);)*) => {
        impl Events {
            $(
                $(#[$doc])*
                pub fn $name<F>(&mut self, callback: F)
                where
                    F: FnMut(&mut Connection, $($ty),*) + 'static,
                {
                    self.$field.push(Box::new(callback));
                }
            )*
        }
    };
}

register! {
    /// Server accepted registration (`001`).
    on_connect: connect => ();
    /// PRIVMSG to us or a shared channel: `(from, target, text)`.
    on_message: message => (&IrcUser, &str, &str);
    /// NOTICE to us or a shared channel: `(from, target, text)`.
    on_notice: notice => (&IrcUser, &str, &str);
    /// CTCP query in a PRIVMSG: `(from, target, tag, message)`.
    on_ctcp_query: ctcp_query => (&IrcUser, &str, &str, Option<&str>);
    /// CTCP reply in a NOTICE: `(from, target, tag, message)`.
    on_ctcp_reply: ctcp_reply => (&IrcUser, &str, &str, Option<&str>);
    /// Someone else joined a channel we are in: `(user, channel)`.
    on_join: join => (&IrcUser, &str);
    /// We joined a channel.
    on_successful_join: successful_join => (&str);
    /// The server is throttling our rejoin (`495`): `(channel, seconds)`.
    on_join_too_soon: join_too_soon => (&str, u64);
    /// A user (possibly us) left a channel: `(user, channel)`.
    on_part: part => (&IrcUser, &str);
    /// A user quit the network: `(user, message)`.
    on_quit: quit => (&IrcUser, Option<&str>);
    /// A user (possibly us) was kicked: `(kicker, channel, kicked, reason)`.
    on_kick: kick => (&IrcUser, &str, &str, Option<&str>);
    /// A MODE change, already applied to tracked state:
    /// `(user, target, modes, args)`.
    on_mode: mode => (&IrcUser, &str, &str, &[String]);
    /// A user changed nick; `user` still carries the old one:
    /// `(user, new_nick)`.
    on_nick_change: nick_change => (&IrcUser, &str);
    /// A user invited us to a channel: `(sender, target, channel)`.
    on_invite: invite => (&IrcUser, &str, &str);
    /// MOTD started.
    on_motd_start: motd_start => (&str);
    /// One MOTD body line.
    on_motd_line: motd_line => (&str);
    /// End of MOTD.
    on_motd_end: motd_end => (&str);
    /// One NAMES reply, prefixes stripped: `(channel, nicks)`.
    on_name_list: name_list => (&str, &[String]);
    /// NAMES finished for a channel.
    on_name_list_end: name_list_end => (&str);
    /// Topic reported on join (`332`): `(channel, topic)`.
    on_topic: topic => (&str, &str);
    /// Topic changed live (TOPIC): `(user, channel, topic)`.
    on_topic_change: topic_change => (&IrcUser, &str, &str);
    /// Topic metadata (`333`): `(channel, setter, time)`.
    on_topic_info: topic_info => (&str, &str, &str);
    /// WHOIS identity reply (`311`).
    on_whois_reply: whois_reply => (&IrcUser);
    /// WHOIS server reply (`312`): `(nick, server, info)`.
    on_whois_server_reply: whois_server_reply => (&str, &str, &str);
    /// WHOIS operator reply (`313`): `(nick, text)`.
    on_whois_operator_reply: whois_operator_reply => (&str, &str);
    /// WHOIS idle reply (`317`): `(nick, idle_seconds)`.
    on_whois_idle_reply: whois_idle_reply => (&str, u64);
    /// WHOIS channels reply (`319`), prefixes stripped: `(nick, channels)`.
    on_whois_channels_reply: whois_channels_reply => (&str, &[String]);
    /// WHOIS account reply (`330`): `(nick, account)`.
    on_whois_account_reply: whois_account_reply => (&str, &str);
    /// WHOIS registered-nick reply (`307`): `(nick, text)`.
    on_whois_registered_reply: whois_registered_reply => (&str, &str);
    /// End of WHOIS (`318`).
    on_whois_end: whois_end => (&str);
}

impl Events {
    /// Register a nick-collision handler. Handlers run in order until one
    /// returns `true`.
    pub fn on_nick_in_use<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Connection, &str) -> bool + 'static,
    {
        self.nick_in_use.push(Box::new(callback));
    }

    /// Fire the collision chain; `true` if some handler dealt with it.
    pub(crate) fn fire_nick_in_use(&mut self, conn: &mut Connection, nick: &str) -> bool {
        self.nick_in_use.iter_mut().any(|cb| cb(conn, nick))
    }

    /// Fire one event to its subscribers, registration order.
    pub(crate) fn fire(&mut self, conn: &mut Connection, event: &Event) {
        match event {
            Event::Connect => {
                for cb in &mut self.connect {
                    cb(conn);
                }
            }
            Event::Message { from, target, text } => {
                for cb in &mut self.message {
                    cb(conn, from, target, text);
                }
            }
            Event::Notice { from, target, text } => {
                for cb in &mut self.notice {
                    cb(conn, from, target, text);
                }
            }
            Event::CtcpQuery { from, target, tag, message } => {
                for cb in &mut self.ctcp_query {
                    cb(conn, from, target, tag, message.as_deref());
                }
            }
            Event::CtcpReply { from, target, tag, message } => {
                for cb in &mut self.ctcp_reply {
                    cb(conn, from, target, tag, message.as_deref());
                }
            }
            Event::Join { user, channel } => {
                for cb in &mut self.join {
                    cb(conn, user, channel);
                }
            }
            Event::SuccessfulJoin { channel } => {
                for cb in &mut self.successful_join {
                    cb(conn, channel);
                }
            }
            Event::JoinTooSoon { channel, seconds } => {
                for cb in &mut self.join_too_soon {
                    cb(conn, channel, *seconds);
                }
            }
            Event::Part { user, channel } => {
                for cb in &mut self.part {
                    cb(conn, user, channel);
                }
            }
            Event::Quit { user, message } => {
                for cb in &mut self.quit {
                    cb(conn, user, message.as_deref());
                }
            }
            Event::Kick { kicker, channel, kicked, reason } => {
                for cb in &mut self.kick {
                    cb(conn, kicker, channel, kicked, reason.as_deref());
                }
            }
            Event::Mode { user, target, modes, args } => {
                for cb in &mut self.mode {
                    cb(conn, user, target, modes, args);
                }
            }
            Event::NickChange { user, new_nick } => {
                for cb in &mut self.nick_change {
                    cb(conn, user, new_nick);
                }
            }
            Event::NickInUse { nick } => {
                // Routed through fire_nick_in_use by the poll loop.
                debug_assert!(false, "NickInUse must not reach fire(): {nick}");
            }
            Event::Invite { sender, target, channel } => {
                for cb in &mut self.invite {
                    cb(conn, sender, target, channel);
                }
            }
            Event::MotdStart { text } => {
                for cb in &mut self.motd_start {
                    cb(conn, text);
                }
            }
            Event::MotdLine { text } => {
                for cb in &mut self.motd_line {
                    cb(conn, text);
                }
            }
            Event::MotdEnd { text } => {
                for cb in &mut self.motd_end {
                    cb(conn, text);
                }
            }
            Event::NameList { channel, nicks } => {
                for cb in &mut self.name_list {
                    cb(conn, channel, nicks);
                }
            }
            Event::NameListEnd { channel } => {
                for cb in &mut self.name_list_end {
                    cb(conn, channel);
                }
            }
            Event::Topic { channel, topic } => {
                for cb in &mut self.topic {
                    cb(conn, channel, topic);
                }
            }
            Event::TopicChange { user, channel, topic } => {
                for cb in &mut self.topic_change {
                    cb(conn, user, channel, topic);
                }
            }
            Event::TopicInfo { channel, setter, time } => {
                for cb in &mut self.topic_info {
                    cb(conn, channel, setter, time);
                }
            }
            Event::WhoisReply { user } => {
                for cb in &mut self.whois_reply {
                    cb(conn, user);
                }
            }
            Event::WhoisServer { nick, server, info } => {
                for cb in &mut self.whois_server_reply {
                    cb(conn, nick, server, info);
                }
            }
            Event::WhoisOperator { nick, text } => {
                for cb in &mut self.whois_operator_reply {
                    cb(conn, nick, text);
                }
            }
            Event::WhoisIdle { nick, seconds } => {
                for cb in &mut self.whois_idle_reply {
                    cb(conn, nick, *seconds);
                }
            }
            Event::WhoisChannels { nick, channels } => {
                for cb in &mut self.whois_channels_reply {
                    cb(conn, nick, channels);
                }
            }
            Event::WhoisAccount { nick, account } => {
                for cb in &mut self.whois_account_reply {
                    cb(conn, nick, account);
                }
            }
            Event::WhoisRegistered { nick, text } => {
                for cb in &mut self.whois_registered_reply {
                    cb(conn, nick, text);
                }
            }
            Event::WhoisEnd { nick } => {
                for cb in &mut self.whois_end {
                    cb(conn, nick);
                }
            }
        }
    }
}
