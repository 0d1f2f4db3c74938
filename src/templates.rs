//! Report templates and the prompt directives behind them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateName {
    BulletSummary,
    TwoColumn,
    DetailedReport,
}

impl TemplateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BulletSummary => "bullet_summary",
            Self::TwoColumn => "two_column",
            Self::DetailedReport => "detailed_report",
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Self::BulletSummary => BULLET_SUMMARY_TEMPLATE,
            Self::TwoColumn => TWO_COLUMN_TEMPLATE,
            Self::DetailedReport => DETAILED_REPORT_TEMPLATE,
        }
    }
}

impl std::fmt::Display for TemplateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const CITATION_INSTRUCTION: &str = "Only cite using the numeric indices from SOURCES.";

const BULLET_SUMMARY_TEMPLATE: &str = "You are a meticulous research writer.\n\
Write a crisp, bulleted executive summary with sections: TL;DR, Key Findings, Evidence, Risks/Unknowns.\n\
Use numbered bullets. Include inline numeric citations like [1], [2] mapped to the SOURCES list I provide.\n\
Strictly obey the structure and headings.";

const TWO_COLUMN_TEMPLATE: &str = "You are a research analyst. Create a markdown table with EXACTLY two columns: Claim | Evidence.\n\n\
CRITICAL REQUIREMENTS:\n\
1. Output ONLY the table - no introduction, no conclusion, no extra text\n\
2. First row must be: | Claim | Evidence |\n\
3. Second row must be separator: |-------|----------|\n\
4. Each following row: | specific claim | evidence with citations [1], [2] |\n\
5. Create 6-12 rows total\n\
6. Each claim must be concise (1-2 sentences)\n\
7. Each evidence must have at least one citation [X]\n\
8. Use proper markdown table format with pipes (|)\n\n\
Example format:\n\
| Claim | Evidence |\n\
|-------|----------|\n\
| First claim here | Supporting evidence with source [1] |\n\
| Second claim here | More evidence from [2] and [3] |\n\n\
DO NOT include any text before or after the table.";

const DETAILED_REPORT_TEMPLATE: &str = "You are an expert research analyst writing a comprehensive, detailed research report.\n\n\
Structure your report as follows:\n\n\
# Executive Summary\n\
A concise 2-3 paragraph overview of the key findings.\n\n\
## Introduction\n\
Background context and scope of the research topic.\n\n\
## Methodology\n\
Brief explanation of research approach and sources analyzed.\n\n\
## Key Findings\n\
Detailed analysis organized into 4-6 subsections with descriptive headings. Each subsection should:\n\
- Present specific data and evidence\n\
- Include multiple citations [1], [2], [3]\n\
- Analyze implications and significance\n\
- Be at least 3-4 paragraphs long\n\n\
## Discussion\n\
Synthesis of findings, identifying patterns, contradictions, and relationships between different aspects.\n\n\
## Limitations & Considerations\n\
Acknowledge gaps in research, potential biases, and areas requiring further investigation.\n\n\
## Conclusion\n\
Summary of main insights and their broader significance.\n\n\
Use academic tone, cite sources frequently with bracketed numbers [1], [2], and aim for depth over brevity. \
Target 1500-2500 words with substantive analysis in each section.";

const TWO_COLUMN_STRICT_SUFFIX: &str = "\n\n**CRITICAL INSTRUCTIONS FOR THIS TASK**: \
You MUST output ONLY a markdown table, nothing else. \
NO introduction, NO explanation, NO conclusion. \
Maximum 12 rows. Each cell: 1-2 sentences maximum. \
Start directly with: | Claim | Evidence |";

const BREVITY_SUFFIX: &str = "\nBe concise and focused. Prioritize quality over length.";

/// Template directive plus the augmentation the quota-limited provider needs.
/// Gemini is prone to over-producing and ignoring formatting constraints, so
/// the two-column template gets a strict table-only suffix and every other
/// template a brevity suffix.
pub fn provider_instructions(template: TemplateName, quota_limited: bool) -> String {
    let base = template.directive();
    if !quota_limited {
        return base.to_string();
    }
    match template {
        TemplateName::TwoColumn => format!("{base}{TWO_COLUMN_STRICT_SUFFIX}"),
        _ => format!("{base}{BREVITY_SUFFIX}"),
    }
}
