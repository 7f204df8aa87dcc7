// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Beam search over a next-token logits function
//!
//! The search is independent of ONNX Runtime: callers supply a step
//! closure mapping the current token sequence to logits for the next
//! position. Hypotheses end at EOS; finished hypotheses are ranked by
//! sum of log-probabilities divided by generated length.

use std::cmp::Ordering;

use crate::error::CaptionError;

/// Search settings for one generate call
#[derive(Debug, Clone, PartialEq)]
pub struct BeamConfig {
    /// Beam width; 1 means greedy decoding
    pub num_beams: usize,
    /// Maximum total sequence length, prompt included
    pub max_length: usize,
    pub eos_token_id: u32,
    /// Stop as soon as `num_beams` hypotheses have finished
    pub early_stopping: bool,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    sum_logprob: f32,
}

/// Run beam search starting from `prompt`
///
/// Returns the generated tokens after the prompt, without the EOS token.
///
/// # Errors
/// Propagates errors from `step`, and returns `CaptionError::Generation`
/// if `step` yields an empty logits vector.
pub fn beam_search<F>(prompt: &[u32], config: &BeamConfig, mut step: F) -> Result<Vec<u32>, CaptionError>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>, CaptionError>,
{
    if prompt.len() >= config.max_length {
        return Ok(Vec::new());
    }

    if config.num_beams <= 1 {
        return greedy(prompt, config, step);
    }

    let num_beams = config.num_beams;
    let prompt_len = prompt.len();
    let mut beams = vec![Hypothesis {
        tokens: prompt.to_vec(),
        sum_logprob: 0.0,
    }];
    let mut finished: Vec<(f32, Vec<u32>)> = Vec::new();

    while !beams.is_empty() && beams[0].tokens.len() < config.max_length {
        let mut candidates: Vec<(f32, usize, u32)> = Vec::with_capacity(beams.len() * num_beams * 2);
        for (beam_idx, beam) in beams.iter().enumerate() {
            let logits = step(&beam.tokens)?;
            let logprobs = log_softmax(&logits)?;
            for (token, logprob) in top_k(&logprobs, 2 * num_beams) {
                candidates.push((beam.sum_logprob + logprob, beam_idx, token));
            }
        }
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let mut next = Vec::with_capacity(num_beams);
        for (rank, (score, beam_idx, token)) in candidates.into_iter().enumerate() {
            let parent = &beams[beam_idx].tokens;
            if token == config.eos_token_id {
                // Only EOS among the top candidates may close a hypothesis
                if rank < num_beams {
                    let generated = parent.len() + 1 - prompt_len;
                    add_finished(
                        &mut finished,
                        num_beams,
                        score / generated as f32,
                        parent[prompt_len..].to_vec(),
                    );
                }
                continue;
            }

            let mut tokens = parent.clone();
            tokens.push(token);
            next.push(Hypothesis {
                tokens,
                sum_logprob: score,
            });
            if next.len() == num_beams {
                break;
            }
        }
        beams = next;

        if finished.len() >= num_beams {
            if config.early_stopping {
                break;
            }
            let worst_finished = finished.last().map(|f| f.0).unwrap_or(f32::NEG_INFINITY);
            let best_live = beams
                .first()
                .map(|b| b.sum_logprob / (b.tokens.len() - prompt_len) as f32)
                .unwrap_or(f32::NEG_INFINITY);
            if worst_finished >= best_live {
                break;
            }
        }
    }

    // Hypotheses cut off by max_length compete with finished ones
    for beam in beams {
        let generated = beam.tokens.len() - prompt_len;
        if generated > 0 {
            add_finished(
                &mut finished,
                num_beams,
                beam.sum_logprob / generated as f32,
                beam.tokens[prompt_len..].to_vec(),
            );
        }
    }

    Ok(finished
        .into_iter()
        .next()
        .map(|(_, tokens)| tokens)
        .unwrap_or_default())
}

fn greedy<F>(prompt: &[u32], config: &BeamConfig, mut step: F) -> Result<Vec<u32>, CaptionError>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>, CaptionError>,
{
    let mut tokens = prompt.to_vec();
    while tokens.len() < config.max_length {
        let logits = step(&tokens)?;
        let (next, _) = top_k(&logits, 1)
            .into_iter()
            .next()
            .ok_or_else(|| CaptionError::Generation("Empty logits vector".to_string()))?;
        if next == config.eos_token_id {
            break;
        }
        tokens.push(next);
    }
    Ok(tokens.split_off(prompt.len()))
}

/// Keep `finished` sorted best-first and at most `limit` long
fn add_finished(finished: &mut Vec<(f32, Vec<u32>)>, limit: usize, score: f32, tokens: Vec<u32>) {
    let pos = finished
        .iter()
        .position(|(s, _)| score > *s)
        .unwrap_or(finished.len());
    finished.insert(pos, (score, tokens));
    finished.truncate(limit);
}

pub fn log_softmax(logits: &[f32]) -> Result<Vec<f32>, CaptionError> {
    if logits.is_empty() {
        return Err(CaptionError::Generation("Empty logits vector".to_string()));
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = logits.iter().map(|l| (l - max).exp()).sum::<f32>().ln();
    Ok(logits.iter().map(|l| l - max - log_sum).collect())
}

/// Indices and values of the `k` largest entries, largest first
fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let desc = |a: &usize, b: &usize| values[*b].partial_cmp(&values[*a]).unwrap_or(Ordering::Equal);
    let mut idx: Vec<usize> = (0..values.len()).collect();
    let k = k.min(idx.len());
    if k == 0 {
        return Vec::new();
    }
    if k < idx.len() {
        idx.select_nth_unstable_by(k - 1, desc);
        idx.truncate(k);
    }
    idx.sort_by(desc);
    idx.into_iter().map(|i| (i as u32, values[i])).collect()
}
