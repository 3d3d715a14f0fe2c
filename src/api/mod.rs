// HTTP surface of the bot.

pub mod rest;
