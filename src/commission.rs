use crate::config::Config;

/// Outcome of one commission computation. Derived on demand from a
/// monthly net total; never stored or cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionResult {
    /// Bonus in whole currency units (rounded once, at the end).
    pub bonus: f64,
    /// Label of the last tier that contributed, `None` below the goal.
    pub tier: Option<String>,
    pub excess: f64,
    pub goal_met: bool,
}

/// Compute the progressive-tier bonus for one month's net total.
///
/// The goal comparison is strict: a month that lands exactly on the goal
/// earns nothing. Above it, every tier whose lower bound is reached
/// contributes `(min(excess, upper) - lower) * rate` — tiers accumulate,
/// they do not replace each other. An excess sitting exactly on a
/// boundary belongs to the tier that owns it as upper bound; the next
/// tier's contribution there is zero.
pub fn compute(net_total: f64, config: &Config) -> CommissionResult {
    if net_total < config.monthly_goal {
        return CommissionResult {
            bonus: 0.0,
            tier: None,
            excess: 0.0,
            goal_met: false,
        };
    }

    let excess = net_total - config.monthly_goal;
    let mut bonus = 0.0;
    let mut current: Option<&str> = None;
    for tier in &config.tiers {
        if excess >= tier.lower {
            let in_tier = (excess.min(tier.upper) - tier.lower).max(0.0);
            if in_tier > 0.0 {
                bonus += in_tier * tier.rate;
                current = Some(&tier.label);
            }
        }
    }

    CommissionResult {
        bonus: bonus.round(),
        tier: current.map(str::to_string),
        excess,
        goal_met: true,
    }
}
