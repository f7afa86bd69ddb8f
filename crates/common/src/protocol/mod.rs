// Wire protocol shared by the session client and its gateway.

pub mod ws;
