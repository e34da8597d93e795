//! Prize distribution: ranking and the dust-free pool split.

use gameroom_shared::split_with_remainder;
use soroban_sdk::{Address, Env, Vec};

use crate::{storage, Error, Payout, Room, SplitRule};

/// Up to `limit` participants ordered by score, highest first.
///
/// `scores[i]` belongs to `participants[i]`. Equal scores keep the order of
/// `participants`, so the earlier joiner ranks higher.
pub fn top_ranked(
    env: &Env,
    participants: &Vec<Address>,
    scores: &Vec<u64>,
    limit: u32,
) -> Vec<Address> {
    let mut ranked: Vec<Address> = Vec::new(env);
    let mut ranked_scores: Vec<u64> = Vec::new(env);
    if limit == 0 {
        return ranked;
    }

    for (participant, score) in participants.iter().zip(scores.iter()) {
        let mut pos = ranked_scores.len();
        for i in 0..ranked_scores.len() {
            if score > ranked_scores.get_unchecked(i) {
                pos = i;
                break;
            }
        }
        if pos >= limit {
            continue;
        }

        ranked.insert(pos, participant);
        ranked_scores.insert(pos, score);
        if ranked.len() > limit {
            ranked.pop_back();
            ranked_scores.pop_back();
        }
    }

    ranked
}

/// Split `total` over `ranked` according to `rule`.
///
/// Only ranks that exist are paid. The lowest paid rank receives the
/// remainder, so the amounts always sum to `total`. Zero shares are dropped.
pub fn compute_payouts(
    env: &Env,
    rule: SplitRule,
    total: i128,
    ranked: &Vec<Address>,
) -> Result<Vec<Payout>, Error> {
    let mut payouts = Vec::new(env);
    let paid_ranks = ranked.len().min(rule.tiers()) as usize;
    if paid_ranks == 0 || total == 0 {
        return Ok(payouts);
    }

    let shares = split_with_remainder(env, total, &rule.weights_bps()[..paid_ranks])?;
    for (recipient, amount) in ranked.iter().zip(shares.iter()) {
        if amount > 0 {
            payouts.push_back(Payout { recipient, amount });
        }
    }

    Ok(payouts)
}

/// Payouts for `room` from its current participants and recorded scores.
pub(crate) fn settle(env: &Env, room: &Room) -> Result<Vec<Payout>, Error> {
    let mut scores = Vec::new(env);
    for participant in room.participant_list.iter() {
        scores.push_back(storage::get_score(env, room.id, &participant));
    }

    let ranked = top_ranked(env, &room.participant_list, &scores, room.split_rule.tiers());
    compute_payouts(env, room.split_rule, room.total_prize_pool, &ranked)
}
