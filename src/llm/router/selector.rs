// src/llm/router/selector.rs
// Model router (§4.9): picks (provider, model, maxTokens) from query
// analysis, intent, and estimated context size.

use crate::config::RouterConfig;

use super::types::{Complexity, Intent, QueryAnalysis, RoutingDecision};

pub struct ModelRouter {
    config: RouterConfig,
}

impl ModelRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// `context_tokens` is the estimated size of the assembled prompt
    /// (system messages + context blocks + dialogue tail).
    pub fn route(&self, analysis: &QueryAnalysis, context_tokens: u32) -> RoutingDecision {
        // Short factual / arithmetic: tiny model, tightly capped output.
        if matches!(analysis.intent, Intent::Factual) && analysis.word_count <= 8 {
            return RoutingDecision {
                provider: "default".into(),
                model: self.config.fast_model.clone(),
                max_tokens: 20,
            };
        }

        if matches!(analysis.intent, Intent::ConversationalFollowup) || analysis.suggests_follow_up {
            return RoutingDecision {
                provider: "default".into(),
                model: self.config.fast_model.clone(),
                max_tokens: 200,
            };
        }

        if context_tokens > 50_000 {
            return RoutingDecision {
                provider: "default".into(),
                model: self.config.reasoning_model.clone(),
                max_tokens: self.config.max_context_tokens.min(16_000),
            };
        }

        if matches!(analysis.complexity, Complexity::Complex)
            || matches!(analysis.intent, Intent::Explanatory | Intent::Discussion)
        {
            return RoutingDecision {
                provider: "default".into(),
                model: self.config.reasoning_model.clone(),
                max_tokens: 4_000,
            };
        }

        RoutingDecision {
            provider: "default".into(),
            model: self.config.default_model.clone(),
            max_tokens: 1_000,
        }
    }

    /// A per-query override can shrink `maxTokens` below the profile
    /// default — e.g. a math question routed through a larger model still
    /// caps output at 10 tokens.
    pub fn apply_override(&self, decision: RoutingDecision, override_max_tokens: Option<u32>) -> RoutingDecision {
        match override_max_tokens {
            Some(cap) if cap < decision.max_tokens => RoutingDecision {
                max_tokens: cap,
                ..decision
            },
            _ => decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ModelRouter {
        ModelRouter::new(RouterConfig {
            default_model: "standard".into(),
            reasoning_model: "reasoning".into(),
            fast_model: "fast".into(),
            complexity_threshold_reasoning: 0.7,
            max_context_tokens: 128_000,
        })
    }

    fn analysis(intent: Intent, complexity: Complexity, word_count: usize, follow_up: bool) -> QueryAnalysis {
        QueryAnalysis {
            complexity,
            intent,
            word_count,
            requires_detail: false,
            suggests_follow_up: follow_up,
            memory_save_content: None,
        }
    }

    #[test]
    fn short_factual_uses_fast_model_tiny_budget() {
        let decision = router().route(&analysis(Intent::Factual, Complexity::Simple, 4, false), 500);
        assert_eq!(decision.model, "fast");
        assert_eq!(decision.max_tokens, 20);
    }

    #[test]
    fn follow_up_uses_cost_optimized_profile() {
        let decision = router().route(
            &analysis(Intent::ConversationalFollowup, Complexity::Simple, 2, true),
            500,
        );
        assert_eq!(decision.max_tokens, 200);
    }

    #[test]
    fn large_context_forces_context_heavy_model() {
        let decision = router().route(&analysis(Intent::Discussion, Complexity::Moderate, 20, false), 60_000);
        assert_eq!(decision.model, "reasoning");
    }

    #[test]
    fn complex_reasoning_intent_routes_to_reasoning_model() {
        let decision = router().route(&analysis(Intent::Explanatory, Complexity::Complex, 50, false), 1_000);
        assert_eq!(decision.model, "reasoning");
    }

    #[test]
    fn override_can_shrink_but_not_grow_budget() {
        let base = router().route(&analysis(Intent::Discussion, Complexity::Moderate, 20, false), 500);
        let shrunk = router().apply_override(base.clone(), Some(10));
        assert_eq!(shrunk.max_tokens, 10);
        let unchanged = router().apply_override(base.clone(), Some(999_999));
        assert_eq!(unchanged.max_tokens, base.max_tokens);
    }
}
