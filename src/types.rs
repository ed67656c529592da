/// Opaque ID types for type safety
pub type GuildId = String;
pub type UserId = String;
pub type ConnectionId = String;
