//! Per-command handling of parsed server lines.
//!
//! Each handler mutates tracked state first, then returns the events the
//! poll loop fires, so callbacks always observe post-transition state.
//! Unknown commands are dropped at debug level; a malformed line kills
//! itself but never the session.

use tracing::debug;

use crate::client::Connection;
use crate::ctcp::Ctcp;
use crate::error::{ClientError, Result};
use crate::event::Event;
use crate::message::MessageRef;
use crate::response::Response;
use crate::user::IrcUser;

/// Dispatch one inbound line: mutate state, produce events, send any
/// protocol-mandated replies (PONG, WHO, WHOIS resync).
pub(crate) fn handle(conn: &mut Connection, line: &str) -> Result<Vec<Event>> {
    let msg = MessageRef::parse(line)?;

    // Any sender prefix richer than what we hold patches the stored user.
    if !msg.prefix.is_empty() {
        let parsed = IrcUser::from_prefix(msg.prefix, conn.now());
        if let Some(known) = conn.tracker.get_user_mut(parsed.nick()) {
            known.patch_from(&parsed);
        }
    }

    match msg.command {
        "PING" => {
            conn.write_line(&format!("PONG :{}", msg.arg(0)))?;
            Ok(Vec::new())
        }
        // The keep-alive machinery counts every inbound line, so PONG
        // itself needs no handling.
        "PONG" => Ok(Vec::new()),
        "ERROR" => Err(ClientError::Server(msg.arg(0).to_owned())),
        "PRIVMSG" => on_privmsg(conn, &msg),
        "NOTICE" => on_notice(conn, &msg),
        "JOIN" => on_join(conn, &msg),
        "PART" => on_part(conn, &msg),
        "KICK" => on_kick(conn, &msg),
        "QUIT" => on_quit(conn, &msg),
        "NICK" => on_nick(conn, &msg),
        "MODE" => on_mode(conn, &msg),
        "TOPIC" => {
            let user = sender_snapshot(conn, &msg);
            Ok(vec![Event::TopicChange {
                user,
                channel: msg.arg(0).to_owned(),
                topic: msg.arg(1).to_owned(),
            }])
        }
        "INVITE" => {
            let sender = sender_snapshot(conn, &msg);
            Ok(vec![Event::Invite {
                sender,
                target: msg.arg(0).to_owned(),
                channel: msg.arg(1).to_owned(),
            }])
        }
        command => match command.parse::<Response>() {
            Ok(code) => on_numeric(conn, code, &msg),
            Err(()) => {
                debug!(command, "ignoring unknown command");
                Ok(Vec::new())
            }
        },
    }
}

/// Resolve the sender, patch identity, and return an owned snapshot.
fn sender_snapshot(conn: &mut Connection, msg: &MessageRef<'_>) -> IrcUser {
    let now = conn.now();
    conn.tracker.get_or_make_user(msg.prefix, now).clone()
}

/// The nick part of a `nick!user@host` prefix.
fn nick_of(prefix: &str) -> &str {
    match prefix.find('!') {
        Some(i) => &prefix[..i],
        None => prefix,
    }
}

fn on_privmsg(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let now = conn.now();
    let sender = conn.tracker.get_or_make_user(msg.prefix, now);
    sender.reset_action_time(now);
    let from = sender.clone();

    let target = msg.arg(0).to_owned();
    let text = msg.arg(1);
    if Ctcp::is_ctcp(text) {
        if let Some(ctcp) = Ctcp::parse(text) {
            return Ok(vec![Event::CtcpQuery {
                from,
                target,
                tag: ctcp.tag.to_owned(),
                message: ctcp.message.map(str::to_owned),
            }]);
        }
    }

    Ok(vec![Event::Message {
        from,
        target,
        text: text.to_owned(),
    }])
}

fn on_notice(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let now = conn.now();
    let sender = conn.tracker.get_or_make_user(msg.prefix, now);
    sender.reset_action_time(now);
    let from = sender.clone();

    let target = msg.arg(0).to_owned();
    let text = msg.arg(1);
    if Ctcp::is_ctcp(text) {
        if let Some(ctcp) = Ctcp::parse(text) {
            return Ok(vec![Event::CtcpReply {
                from,
                target,
                tag: ctcp.tag.to_owned(),
                message: ctcp.message.map(str::to_owned),
            }]);
        }
    }

    Ok(vec![Event::Notice {
        from,
        target,
        text: text.to_owned(),
    }])
}

fn on_join(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let now = conn.now();
    let channel = msg.arg(0).to_owned();
    let nick = nick_of(msg.prefix);

    if conn.tracker.is_self(nick) {
        conn.tracker.add_channel(&channel);
        return Ok(vec![Event::SuccessfulJoin { channel }]);
    }

    conn.tracker.get_or_make_user(msg.prefix, now);
    conn.tracker.track_membership(nick, &channel, now);
    let user = conn
        .tracker
        .get_user(nick)
        .cloned()
        .unwrap_or_else(|| IrcUser::from_prefix(msg.prefix, now));
    Ok(vec![Event::Join { user, channel }])
}

fn on_part(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let channel = msg.arg(0).to_owned();
    let user = sender_snapshot(conn, msg);

    if conn.tracker.is_self(user.nick()) {
        conn.tracker.remove_channel(&channel);
    } else {
        conn.tracker.drop_membership(user.nick(), &channel);
    }
    Ok(vec![Event::Part { user, channel }])
}

fn on_kick(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let now = conn.now();
    let channel = msg.arg(0).to_owned();
    let kicked = msg.arg(1).to_owned();
    let reason = msg.args.get(2).map(|r| (*r).to_owned());

    let kicker = conn.tracker.get_or_make_user(msg.prefix, now);
    kicker.reset_action_time(now);
    let kicker = kicker.clone();

    if conn.tracker.is_self(&kicked) {
        conn.tracker.remove_channel(&channel);
    } else {
        conn.tracker.drop_membership(&kicked, &channel);
    }

    Ok(vec![Event::Kick {
        kicker,
        channel,
        kicked,
        reason,
    }])
}

fn on_quit(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let user = sender_snapshot(conn, msg);
    let message = msg.args.first().map(|m| (*m).to_owned());

    if !conn.tracker.is_self(user.nick()) {
        conn.tracker.remove_user(user.nick());
    }
    Ok(vec![Event::Quit { user, message }])
}

fn on_nick(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let new_nick = msg.arg(0).to_owned();
    // The snapshot keeps the old nick for the callback's benefit.
    let user = sender_snapshot(conn, msg);
    conn.tracker.rename_user(user.nick(), &new_nick);
    Ok(vec![Event::NickChange { user, new_nick }])
}

fn on_mode(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let user = sender_snapshot(conn, msg);
    let target = msg.arg(0).to_owned();
    let modes = msg.arg(1).to_owned();
    let params: Vec<&str> = msg.args.iter().skip(2).copied().collect();

    if target.starts_with('#') {
        let Connection { tracker, info, .. } = conn;
        let resync = match tracker.channel_mut(&target) {
            Some(chan) => chan.apply_mode(&modes, &params, info)?,
            None => Vec::new(),
        };
        // Privilege may survive a removed mode through modes we no longer
        // track; let WHOIS re-establish the truth.
        for nick in resync {
            conn.write_line(&format!("WHOIS {nick}"))?;
        }
    }

    Ok(vec![Event::Mode {
        user,
        target,
        modes,
        args: params.into_iter().map(str::to_owned).collect(),
    }])
}

fn on_numeric(conn: &mut Connection, code: Response, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    use Response::*;

    match code {
        RPL_WELCOME => Ok(vec![Event::Connect]),
        RPL_ISUPPORT => {
            conn.info.apply_isupport(&msg.args)?;
            Ok(Vec::new())
        }
        RPL_TOPIC => Ok(vec![Event::Topic {
            channel: msg.arg(1).to_owned(),
            topic: msg.arg(2).to_owned(),
        }]),
        RPL_TOPICWHOTIME => Ok(vec![Event::TopicInfo {
            channel: msg.arg(1).to_owned(),
            setter: msg.arg(2).to_owned(),
            time: msg.arg(3).to_owned(),
        }]),
        RPL_WHOREPLY => on_who_reply(conn, msg),
        RPL_NAMREPLY => on_names_reply(conn, msg),
        RPL_ENDOFNAMES => {
            let channel = msg.arg(1).to_owned();
            conn.write_line(&format!("WHO {channel}"))?;
            Ok(vec![Event::NameListEnd { channel }])
        }
        RPL_MOTDSTART => Ok(vec![Event::MotdStart {
            text: msg.arg(1).to_owned(),
        }]),
        RPL_MOTD => Ok(vec![Event::MotdLine {
            text: msg.arg(1).to_owned(),
        }]),
        RPL_ENDOFMOTD => Ok(vec![Event::MotdEnd {
            text: msg.arg(1).to_owned(),
        }]),
        RPL_HOSTHIDDEN => {
            conn.tracker.myself_mut().set_host(msg.arg(1));
            Ok(Vec::new())
        }
        ERR_NICKNAMEINUSE => Ok(vec![Event::NickInUse {
            nick: msg.arg(1).to_owned(),
        }]),
        RPL_WHOISUSER => {
            let now = conn.now();
            let user = conn.tracker.ensure_user(msg.arg(1), now);
            user.set_user(msg.arg(2));
            user.set_host(msg.arg(3));
            user.set_real_name(msg.arg(5));
            let user = user.clone();
            Ok(vec![Event::WhoisReply { user }])
        }
        RPL_WHOISSERVER => Ok(vec![Event::WhoisServer {
            nick: msg.arg(1).to_owned(),
            server: msg.arg(2).to_owned(),
            info: msg.arg(3).to_owned(),
        }]),
        RPL_WHOISOPERATOR => Ok(vec![Event::WhoisOperator {
            nick: msg.arg(1).to_owned(),
            text: msg.arg(2).to_owned(),
        }]),
        RPL_WHOISIDLE => Ok(vec![Event::WhoisIdle {
            nick: msg.arg(1).to_owned(),
            seconds: msg.arg(2).parse().unwrap_or(0),
        }]),
        RPL_ENDOFWHOIS => Ok(vec![Event::WhoisEnd {
            nick: msg.arg(1).to_owned(),
        }]),
        RPL_WHOISCHANNELS => on_whois_channels(conn, msg),
        RPL_WHOISACCOUNT => Ok(vec![Event::WhoisAccount {
            nick: msg.arg(1).to_owned(),
            account: msg.arg(2).to_owned(),
        }]),
        RPL_WHOISREGNICK => Ok(vec![Event::WhoisRegistered {
            nick: msg.arg(1).to_owned(),
            text: msg.arg(2).to_owned(),
        }]),
        ERR_DELAYREJOIN => Ok(vec![Event::JoinTooSoon {
            channel: msg.arg(1).to_owned(),
            seconds: rejoin_delay_seconds(msg.arg(2)),
        }]),
        code => {
            if !code.is_ignored() {
                debug!(code = code.code(), "unhandled numeric");
            }
            Ok(Vec::new())
        }
    }
}

/// `352`: `<me> <channel> <user> <host> <server> <nick> <flags> :<hops> <real>`.
///
/// Fills in identity for a tracked user and derives the channel prefix from
/// the flags field.
fn on_who_reply(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let nick = msg.arg(5);
    let Connection { tracker, info, .. } = conn;

    if let Some(user) = tracker.get_user_mut(nick) {
        user.set_user(msg.arg(2));
        user.set_host(msg.arg(3));
        // The trailing field is "<hopcount> <real name>".
        let real = msg.arg(7).trim_start_matches(|c: char| c.is_ascii_digit());
        user.set_real_name(real.trim_start());

        if let Some(prefix) = msg.arg(6).chars().find(|&c| info.is_user_prefix(c)) {
            if let Some(chan) = tracker.channel_mut(msg.arg(1)) {
                chan.set_mode(nick, prefix, info);
            }
        }
    }

    Ok(Vec::new())
}

/// `353`: `<me> <visibility> <channel> :[prefix]nick …`.
fn on_names_reply(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let now = conn.now();
    let channel = msg.arg(2).to_owned();
    let Connection { tracker, info, .. } = conn;

    let mut nicks = Vec::new();
    for token in msg.arg(3).split_whitespace() {
        let (prefixes, nick) = info.strip_prefixes(token);
        if nick.is_empty() {
            continue;
        }

        if !tracker.is_self(nick) {
            tracker.track_membership(nick, &channel, now);
        }
        if let Some(prefix) = prefixes.chars().next() {
            if let Some(chan) = tracker.channel_mut(&channel) {
                chan.set_mode(nick, prefix, info);
            }
        }
        nicks.push(nick.to_owned());
    }

    Ok(vec![Event::NameList { channel, nicks }])
}

/// `319`: `<me> <nick> :[prefix]#chan …`. Carries the whois'd user's
/// privilege in every shared channel.
fn on_whois_channels(conn: &mut Connection, msg: &MessageRef<'_>) -> Result<Vec<Event>> {
    let nick = msg.arg(1).to_owned();
    let Connection { tracker, info, .. } = conn;

    let mut channels = Vec::new();
    for token in msg.arg(2).split_whitespace() {
        let (prefixes, name) = info.strip_prefixes(token);
        if name.is_empty() {
            continue;
        }

        if let Some(prefix) = prefixes.chars().next() {
            if let Some(chan) = tracker.channel_mut(name) {
                if chan.has_member(&nick) {
                    chan.set_mode(&nick, prefix, info);
                }
            }
        }
        channels.push(name.to_owned());
    }

    Ok(vec![Event::WhoisChannels { nick, channels }])
}

/// Pull "<n> second(s)" out of a natural-language throttle reason.
fn rejoin_delay_seconds(reason: &str) -> u64 {
    let words: Vec<&str> = reason.split_whitespace().collect();
    for pair in words.windows(2) {
        if let Ok(n) = pair[0].parse::<u64>() {
            if pair[1].to_ascii_lowercase().starts_with("second") {
                return n;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nick_of_cuts_at_bang() {
        assert_eq!(nick_of("alice!u@h"), "alice");
        assert_eq!(nick_of("irc.server.net"), "irc.server.net");
    }

    #[test]
    fn rejoin_delay_parses_seconds() {
        assert_eq!(
            rejoin_delay_seconds("You must wait 5 seconds after being kicked to rejoin (+J)"),
            5
        );
        assert_eq!(rejoin_delay_seconds("wait 1 second please"), 1);
        assert_eq!(rejoin_delay_seconds("try again later"), 0);
        assert_eq!(rejoin_delay_seconds("wait 10 minutes or 30 seconds"), 30);
    }
}
