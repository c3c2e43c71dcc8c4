use poise::serenity_prelude::{PermissionOverwriteType, Permissions};

use super::snapshot::{GuildSnapshot, MemberState, VoiceChannel};

/// Permissions a member needs on a voice channel to be moved or suggested there
pub const ACCESS_PERMISSIONS: Permissions =
    Permissions::VIEW_CHANNEL.union(Permissions::CONNECT);

/// Guild-level permissions of a member: @everyone plus every role they hold
pub fn base_permissions(guild: &GuildSnapshot, member: &MemberState) -> Permissions {
    if member.id == guild.owner_id {
        return Permissions::all();
    }

    let everyone = guild
        .role_permissions
        .get(&guild.everyone_role())
        .copied()
        .unwrap_or_else(Permissions::empty);

    let permissions = member
        .roles
        .iter()
        .filter_map(|role| guild.role_permissions.get(role))
        .fold(everyone, |acc, role| acc | *role);

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}

/// Effective permissions of a member in a channel, overwrites applied the way
/// Discord does: @everyone, then all member roles together, then the member.
pub fn permissions_for(
    guild: &GuildSnapshot,
    channel: &VoiceChannel,
    member: &MemberState,
) -> Permissions {
    let base = base_permissions(guild, member);
    if base.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let everyone = guild.everyone_role();
    let mut permissions = base;

    let mut role_allow = Permissions::empty();
    let mut role_deny = Permissions::empty();
    let mut member_overwrite = None;

    for overwrite in &channel.overwrites {
        match overwrite.kind {
            PermissionOverwriteType::Role(role) if role == everyone => {
                permissions &= !overwrite.deny;
                permissions |= overwrite.allow;
            }
            PermissionOverwriteType::Role(role) if member.roles.contains(&role) => {
                role_allow |= overwrite.allow;
                role_deny |= overwrite.deny;
            }
            PermissionOverwriteType::Member(user) if user == member.id => {
                member_overwrite = Some((overwrite.allow, overwrite.deny));
            }
            _ => {}
        }
    }

    permissions &= !role_deny;
    permissions |= role_allow;

    if let Some((allow, deny)) = member_overwrite {
        permissions &= !deny;
        permissions |= allow;
    }

    permissions
}

/// Whether `member` may both see and join `channel`.
/// Always computed from the given snapshot, never cached.
pub fn can_access(guild: &GuildSnapshot, channel: &VoiceChannel, member: &MemberState) -> bool {
    permissions_for(guild, channel, member).contains(ACCESS_PERMISSIONS)
}

/// Whether every member in `members` may access `channel`
pub fn all_can_access<'a, I>(guild: &GuildSnapshot, channel: &VoiceChannel, members: I) -> bool
where
    I: IntoIterator<Item = &'a MemberState>,
{
    members
        .into_iter()
        .all(|member| can_access(guild, channel, member))
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{PermissionOverwrite, RoleId, UserId};

    use super::*;
    use crate::moderation::snapshot::test_support::*;

    fn role_overwrite(role: u64, allow: Permissions, deny: Permissions) -> PermissionOverwrite {
        PermissionOverwrite {
            allow,
            deny,
            kind: PermissionOverwriteType::Role(RoleId::new(role)),
        }
    }

    fn member_overwrite(user: u64, allow: Permissions, deny: Permissions) -> PermissionOverwrite {
        PermissionOverwrite {
            allow,
            deny,
            kind: PermissionOverwriteType::Member(UserId::new(user)),
        }
    }

    #[test]
    fn test_everyone_can_access_open_channel() {
        let g = guild();
        assert!(can_access(&g, &channel(10, "General"), &member(1, "Ann")));
    }

    #[test]
    fn test_everyone_deny_blocks_access() {
        let g = guild();
        let mut private = channel(10, "Staff");
        private
            .overwrites
            .push(role_overwrite(GUILD, Permissions::empty(), Permissions::VIEW_CHANNEL));

        assert!(!can_access(&g, &private, &member(1, "Ann")));
    }

    #[test]
    fn test_role_allow_overrides_everyone_deny() {
        let mut g = guild();
        g.role_permissions.insert(RoleId::new(50), Permissions::empty());
        let mut staff = channel(10, "Staff");
        staff
            .overwrites
            .push(role_overwrite(GUILD, Permissions::empty(), ACCESS_PERMISSIONS));
        staff
            .overwrites
            .push(role_overwrite(50, ACCESS_PERMISSIONS, Permissions::empty()));

        let mut moderator = member(1, "Mod");
        moderator.roles.push(RoleId::new(50));

        assert!(can_access(&g, &staff, &moderator));
        assert!(!can_access(&g, &staff, &member(2, "Guest")));
    }

    #[test]
    fn test_role_allow_wins_over_other_role_deny() {
        let mut g = guild();
        g.role_permissions.insert(RoleId::new(50), Permissions::empty());
        g.role_permissions.insert(RoleId::new(51), Permissions::empty());
        let mut ch = channel(10, "Mixed");
        ch.overwrites
            .push(role_overwrite(50, Permissions::empty(), Permissions::CONNECT));
        ch.overwrites
            .push(role_overwrite(51, Permissions::CONNECT, Permissions::empty()));

        let mut m = member(1, "Ann");
        m.roles = vec![RoleId::new(50), RoleId::new(51)];
        assert!(can_access(&g, &ch, &m));
    }

    #[test]
    fn test_member_deny_overrides_role_allow() {
        let mut g = guild();
        g.role_permissions.insert(RoleId::new(50), Permissions::empty());
        let mut ch = channel(10, "General");
        ch.overwrites
            .push(role_overwrite(50, ACCESS_PERMISSIONS, Permissions::empty()));
        ch.overwrites
            .push(member_overwrite(1, Permissions::empty(), Permissions::CONNECT));

        let mut m = member(1, "Ann");
        m.roles.push(RoleId::new(50));
        assert!(!can_access(&g, &ch, &m));
        assert!(permissions_for(&g, &ch, &m).contains(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_owner_and_administrator_bypass_overwrites() {
        let mut g = guild();
        g.role_permissions
            .insert(RoleId::new(60), Permissions::ADMINISTRATOR);
        let mut locked = channel(10, "Locked");
        locked
            .overwrites
            .push(role_overwrite(GUILD, Permissions::empty(), ACCESS_PERMISSIONS));

        let owner = member(OWNER, "Owner");
        let mut admin = member(2, "Admin");
        admin.roles.push(RoleId::new(60));

        assert!(can_access(&g, &locked, &owner));
        assert!(can_access(&g, &locked, &admin));
        assert!(!can_access(&g, &locked, &member(3, "Guest")));
    }

    #[test]
    fn test_connect_without_view_is_not_access() {
        let mut g = guild();
        g.role_permissions
            .insert(RoleId::new(GUILD), Permissions::CONNECT);
        assert!(!can_access(&g, &channel(10, "General"), &member(1, "Ann")));
    }

    #[test]
    fn test_access_is_monotonic_under_added_grants() {
        let mut g = guild();
        g.role_permissions.insert(RoleId::new(50), Permissions::empty());
        let mut m = member(1, "Ann");
        m.roles.push(RoleId::new(50));

        let mut ch = channel(10, "General");
        ch.overwrites
            .push(role_overwrite(GUILD, Permissions::empty(), Permissions::CONNECT));
        ch.overwrites
            .push(role_overwrite(50, Permissions::CONNECT, Permissions::empty()));
        assert!(can_access(&g, &ch, &m));

        // Grant more on every overwrite and add a member allow; nothing is removed
        let extra = Permissions::SPEAK | Permissions::STREAM;
        let mut wider = ch.clone();
        for overwrite in &mut wider.overwrites {
            overwrite.allow |= extra;
        }
        wider
            .overwrites
            .push(member_overwrite(1, Permissions::MUTE_MEMBERS, Permissions::empty()));
        assert!(can_access(&g, &wider, &m));

        g.role_permissions
            .insert(RoleId::new(50), Permissions::PRIORITY_SPEAKER);
        assert!(can_access(&g, &wider, &m));
    }

    #[test]
    fn test_all_can_access() {
        let g = guild();
        let mut ch = channel(10, "General");
        ch.overwrites
            .push(member_overwrite(2, Permissions::empty(), Permissions::CONNECT));

        let ann = member(1, "Ann");
        let bob = member(2, "Bob");
        assert!(all_can_access(&g, &ch, [&ann]));
        assert!(!all_can_access(&g, &ch, [&ann, &bob]));
        assert!(all_can_access(&g, &ch, std::iter::empty::<&MemberState>()));
    }
}
