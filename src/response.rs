//! IRC numeric response codes consumed by the client dispatcher.
//!
//! Servers report command results and state as three-digit numerics. This
//! enum names the numerics the engine reacts to (or deliberately ignores);
//! anything else reaches the dispatcher as an unknown command and is
//! logged at debug level.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

use std::str::FromStr;

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 002 - Your host is running version
    RPL_YOURHOST = 2,
    /// 003 - Server creation date
    RPL_CREATED = 3,
    /// 004 - Server info (name, version, user modes, channel modes)
    RPL_MYINFO = 4,
    /// 005 - Server supported features (ISUPPORT)
    RPL_ISUPPORT = 5,
    /// 042 - Your unique ID
    RPL_YOURID = 42,
    /// 251 - Luser client count
    RPL_LUSERCLIENT = 251,
    /// 254 - Luser channel count
    RPL_LUSERCHANNELS = 254,
    /// 255 - Luser local info
    RPL_LUSERME = 255,
    /// 265 - Local user count
    RPL_LOCALUSERS = 265,
    /// 266 - Global user count
    RPL_GLOBALUSERS = 266,
    /// 302 - Userhost reply
    RPL_USERHOST = 302,
    /// 307 - Whois: nick is registered
    RPL_WHOISREGNICK = 307,
    /// 311 - Whois user info (nick, user, host, realname)
    RPL_WHOISUSER = 311,
    /// 312 - Whois server info
    RPL_WHOISSERVER = 312,
    /// 313 - Whois: user is an operator
    RPL_WHOISOPERATOR = 313,
    /// 315 - End of WHO list
    RPL_ENDOFWHO = 315,
    /// 317 - Whois idle time
    RPL_WHOISIDLE = 317,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS = 318,
    /// 319 - Whois channel list
    RPL_WHOISCHANNELS = 319,
    /// 330 - Whois logged-in account
    RPL_WHOISACCOUNT = 330,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 333 - Topic setter and time
    RPL_TOPICWHOTIME = 333,
    /// 352 - WHO reply
    RPL_WHOREPLY = 352,
    /// 353 - NAMES reply
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 372 - MOTD line
    RPL_MOTD = 372,
    /// 375 - MOTD start
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 396 - Displayed host changed
    RPL_HOSTHIDDEN = 396,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 495 - Must wait before rejoining after a kick (+J)
    ERR_DELAYREJOIN = 495,
}

impl Response {
    /// The numeric code of this response.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a response by numeric code.
    pub fn from_code(code: u16) -> Option<Response> {
        use Response::*;
        Some(match code {
            1 => RPL_WELCOME,
            2 => RPL_YOURHOST,
            3 => RPL_CREATED,
            4 => RPL_MYINFO,
            5 => RPL_ISUPPORT,
            42 => RPL_YOURID,
            251 => RPL_LUSERCLIENT,
            254 => RPL_LUSERCHANNELS,
            255 => RPL_LUSERME,
            265 => RPL_LOCALUSERS,
            266 => RPL_GLOBALUSERS,
            302 => RPL_USERHOST,
            307 => RPL_WHOISREGNICK,
            311 => RPL_WHOISUSER,
            312 => RPL_WHOISSERVER,
            313 => RPL_WHOISOPERATOR,
            315 => RPL_ENDOFWHO,
            317 => RPL_WHOISIDLE,
            318 => RPL_ENDOFWHOIS,
            319 => RPL_WHOISCHANNELS,
            330 => RPL_WHOISACCOUNT,
            332 => RPL_TOPIC,
            333 => RPL_TOPICWHOTIME,
            352 => RPL_WHOREPLY,
            353 => RPL_NAMREPLY,
            366 => RPL_ENDOFNAMES,
            372 => RPL_MOTD,
            375 => RPL_MOTDSTART,
            376 => RPL_ENDOFMOTD,
            396 => RPL_HOSTHIDDEN,
            433 => ERR_NICKNAMEINUSE,
            495 => ERR_DELAYREJOIN,
            _ => return None,
        })
    }

    /// Numerics the dispatcher receives and intentionally drops.
    pub fn is_ignored(self) -> bool {
        use Response::*;
        matches!(
            self,
            RPL_YOURHOST
                | RPL_CREATED
                | RPL_MYINFO
                | RPL_YOURID
                | RPL_LUSERCLIENT
                | RPL_LUSERCHANNELS
                | RPL_LUSERME
                | RPL_LOCALUSERS
                | RPL_GLOBALUSERS
                | RPL_USERHOST
                | RPL_ENDOFWHO
        )
    }
}

impl FromStr for Response {
    type Err = ();

    /// Parse a three-digit command token into a response code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(());
        }
        s.parse::<u16>()
            .ok()
            .and_then(Response::from_code)
            .ok_or(())
    }
}
