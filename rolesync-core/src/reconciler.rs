//! Membership reconciliation.
//!
//! For every top-level group, [`plan_group`] diffs the current members
//! against the [`DesiredMembership`] table and [`Reconciler`] applies the
//! resulting actions one call at a time. Groups are handled sequentially
//! and independently, and members outside the desired table are never
//! touched.
//!
//! ```ignore
//! let report = Reconciler::new(&client, &desired)
//!     .run(|event| println!("{event}"))
//!     .await?;
//! ```

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info};

use crate::service::{Group, Member, MembershipService, resolve_user};
use crate::{AccessLevel, DesiredMembership, Result, Role};

/// A single change needed to converge one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipAction {
    /// An existing member holds the wrong access level.
    Update {
        username: String,
        user_id: u64,
        from: AccessLevel,
        to: Role,
    },
    /// A desired user is not a member yet.
    Add { username: String, role: Role },
}

impl MembershipAction {
    pub fn username(&self) -> &str {
        match self {
            MembershipAction::Update { username, .. } | MembershipAction::Add { username, .. } => {
                username
            }
        }
    }
}

/// Actions for one group, in the order they will be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub group: Group,
    /// Role updates in member listing order, then additions by username.
    pub actions: Vec<MembershipAction>,
    /// Desired users that already hold the desired role.
    pub unchanged: usize,
}

impl GroupPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Diff a group's current members against the desired table.
///
/// Members whose username is not in `desired` produce no action.
pub fn plan_group(group: &Group, members: &[Member], desired: &DesiredMembership) -> GroupPlan {
    let mut missing: BTreeSet<&str> = desired.usernames().collect();
    let mut actions = Vec::new();
    let mut unchanged = 0;

    for member in members {
        let Some(role) = desired.role_for(&member.username) else {
            continue;
        };
        missing.remove(member.username.as_str());

        if member.access_level == role.access_level() {
            unchanged += 1;
            continue;
        }

        actions.push(MembershipAction::Update {
            username: member.username.clone(),
            user_id: member.id,
            from: member.access_level,
            to: role,
        });
    }

    actions.extend(missing.into_iter().filter_map(|username| {
        desired.role_for(username).map(|role| MembershipAction::Add {
            username: username.to_string(),
            role,
        })
    }));

    GroupPlan {
        group: group.clone(),
        actions,
        unchanged,
    }
}

/// Progress notifications emitted while reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A group was listed; emitted for sub-groups too.
    GroupListed { full_path: String },
    /// An action is about to be applied (or, on a dry run, would be).
    Action {
        group_path: String,
        action: MembershipAction,
        dry_run: bool,
    },
}

impl fmt::Display for ReconcileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileEvent::GroupListed { full_path } => write!(f, "group {full_path}"),
            ReconcileEvent::Action {
                group_path,
                action,
                dry_run,
            } => {
                if *dry_run {
                    write!(f, "[dry-run] ")?;
                }
                match action {
                    MembershipAction::Update {
                        username, from, to, ..
                    } => write!(
                        f,
                        "{group_path} group: updating user {username} role from {from} to {to}..."
                    ),
                    MembershipAction::Add { username, role } => {
                        write!(f, "{group_path} group: adding user {username} as {role}...")
                    }
                }
            }
        }
    }
}

/// Totals for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Top-level groups whose members were compared.
    pub groups_visited: usize,
    /// Sub-groups that were skipped.
    pub groups_skipped: usize,
    /// Role updates applied (or planned, on a dry run).
    pub updated: usize,
    /// Members added (or planned, on a dry run).
    pub added: usize,
    /// Desired memberships that were already correct.
    pub unchanged: usize,
}

impl ReconcileReport {
    /// Number of mutating calls made (or planned).
    pub fn changes(&self) -> usize {
        self.updated + self.added
    }

    fn record(&mut self, plan: &GroupPlan) {
        self.groups_visited += 1;
        self.unchanged += plan.unchanged;
        for action in &plan.actions {
            match action {
                MembershipAction::Update { .. } => self.updated += 1,
                MembershipAction::Add { .. } => self.added += 1,
            }
        }
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} groups reconciled ({} sub-groups skipped): {} updated, {} added, {} unchanged",
            self.groups_visited, self.groups_skipped, self.updated, self.added, self.unchanged
        )
    }
}

/// Converges every top-level group toward a desired membership table.
///
/// The first failing call aborts the run. Changes already applied stay in
/// place; running again picks up where the failed run stopped.
pub struct Reconciler<'a, S: MembershipService + ?Sized> {
    service: &'a S,
    desired: &'a DesiredMembership,
    dry_run: bool,
}

impl<'a, S: MembershipService + ?Sized> Reconciler<'a, S> {
    pub fn new(service: &'a S, desired: &'a DesiredMembership) -> Self {
        Self {
            service,
            desired,
            dry_run: false,
        }
    }

    /// Plan without making any mutating call.
    ///
    /// Users that would be added are still looked up, so a dry run fails on
    /// the same unknown usernames a real run would.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconcile all groups, reporting progress through `on_event`.
    pub async fn run<F>(&self, mut on_event: F) -> Result<ReconcileReport>
    where
        F: FnMut(&ReconcileEvent),
    {
        let mut report = ReconcileReport::default();
        let groups = self.service.list_groups().await?;
        debug!(count = groups.len(), "listed groups");

        for group in &groups {
            on_event(&ReconcileEvent::GroupListed {
                full_path: group.full_path.clone(),
            });

            if !group.is_top_level() {
                debug!(group = %group.full_path, "skipping sub-group");
                report.groups_skipped += 1;
                continue;
            }

            let members = self.service.list_members(group.id).await?;
            let plan = plan_group(group, &members, self.desired);
            debug!(
                group = %group.full_path,
                members = members.len(),
                actions = plan.actions.len(),
                "planned group"
            );

            self.apply(&plan, &mut on_event).await?;
            report.record(&plan);
        }

        info!(
            groups = report.groups_visited,
            skipped = report.groups_skipped,
            updated = report.updated,
            added = report.added,
            unchanged = report.unchanged,
            dry_run = self.dry_run,
            "reconciliation finished"
        );

        Ok(report)
    }

    async fn apply<F>(&self, plan: &GroupPlan, on_event: &mut F) -> Result<()>
    where
        F: FnMut(&ReconcileEvent),
    {
        let group = &plan.group;

        for action in &plan.actions {
            let event = ReconcileEvent::Action {
                group_path: group.full_path.clone(),
                action: action.clone(),
                dry_run: self.dry_run,
            };

            match action {
                MembershipAction::Update { user_id, to, .. } => {
                    on_event(&event);
                    if !self.dry_run {
                        self.service
                            .update_member(group.id, *user_id, to.access_level())
                            .await?;
                    }
                }
                MembershipAction::Add { username, role } => {
                    let user = resolve_user(self.service, username).await?;
                    on_event(&event);
                    if !self.dry_run {
                        self.service
                            .add_member(group.id, user.id, role.access_level())
                            .await?;
                    }
                }
            }
        }

        Ok(())
    }
}
