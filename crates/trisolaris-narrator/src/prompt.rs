//! Report prompt templates rendered with `minijinja`.
//!
//! Templates are compiled into the binary; each [`ReportKind`] has a user
//! template and shares one system template. Fields come straight from the
//! serialized [`ReportFields`].

use minijinja::Environment;
use trisolaris_core::{ReportFields, ReportKind};

use crate::error::NarratorError;

const SYSTEM_TEMPLATE: &str = "\
You are the chronicler of {{ civilization }}, a civilization that lives under three suns \
and never knows when the next chaotic era will begin. Write plainly, without markdown headings.";

const SANITY_COLLAPSE_TEMPLATE: &str = "\
# Sanity collapse warning

Civilization: {{ civilization }}
Current sanity: {{ current_sanity }}/{{ max_sanity }}
Technology level: {{ tech_level }}
Population: {{ population }}
Triggering event: {{ event }}

Write a warning report covering:
1. How severe the collapse is
2. Likely forms of social unrest
3. Emergency interventions
4. A long-term recovery strategy

Keep it professional and calm, and offer workable measures.";

const EXTINCTION_TEMPLATE: &str = "\
# Extinction report

Civilization: {{ civilization }}
Born: {{ born_at }}
Extinct: {{ occurred_at }}
Cause: {{ event }}
Final tick: {{ tick }}

Write an analysis covering:
1. A brief history of the civilization
2. The root causes of its extinction
3. Warnings for other civilizations
4. What its end says about the universe

Keep it objective and sober.";

/// Sampling parameters per report kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Output token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Sampling {
    /// Parameters used for `kind`.
    pub const fn for_kind(kind: ReportKind) -> Self {
        match kind {
            ReportKind::SanityCollapse => Self {
                max_tokens: 800,
                temperature: 0.6,
            },
            ReportKind::Extinction => Self {
                max_tokens: 1000,
                temperature: 0.7,
            },
        }
    }
}

/// A prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
    /// Sampling parameters.
    pub sampling: Sampling,
}

/// Compiled report templates.
pub struct ReportPrompts {
    env: Environment<'static>,
}

impl ReportPrompts {
    /// Compile the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorError::Template`] if a template fails to parse.
    pub fn new() -> Result<Self, NarratorError> {
        let mut env = Environment::new();
        env.add_template_owned("system", SYSTEM_TEMPLATE.to_owned())
            .map_err(|e| NarratorError::Template(format!("failed to add system template: {e}")))?;
        env.add_template_owned(
            ReportKind::SanityCollapse.as_str(),
            SANITY_COLLAPSE_TEMPLATE.to_owned(),
        )
        .map_err(|e| NarratorError::Template(format!("failed to add collapse template: {e}")))?;
        env.add_template_owned(ReportKind::Extinction.as_str(), EXTINCTION_TEMPLATE.to_owned())
            .map_err(|e| {
                NarratorError::Template(format!("failed to add extinction template: {e}"))
            })?;
        Ok(Self { env })
    }

    /// Render the prompt for one report.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorError::Template`] if rendering fails.
    pub fn render(&self, kind: ReportKind, fields: &ReportFields) -> Result<RenderedPrompt, NarratorError> {
        let system = self
            .env
            .get_template("system")
            .map_err(|e| NarratorError::Template(format!("missing system template: {e}")))?
            .render(fields)
            .map_err(|e| NarratorError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template(kind.as_str())
            .map_err(|e| NarratorError::Template(format!("missing {} template: {e}", kind.as_str())))?
            .render(fields)
            .map_err(|e| NarratorError::Template(format!("{} render failed: {e}", kind.as_str())))?;

        Ok(RenderedPrompt {
            system,
            user,
            sampling: Sampling::for_kind(kind),
        })
    }
}
