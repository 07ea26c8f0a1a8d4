//! Task prompts handed to the remediation agent

use std::fmt::Write as _;

use crate::{Batch, RepoRef};

/// Renders the instructions for one batch
pub trait PromptBuilder: Send + Sync {
    fn build(&self, repo: &RepoRef, batch_id: &str, batch: &Batch) -> String;
}

/// Default builder producing an XML task document
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlPromptBuilder;

impl XmlPromptBuilder {
    pub fn description(batch_id: &str, batch: &Batch) -> String {
        format!(
            "Fix {} security vulnerabilities of type '{}' with severity {}",
            batch.tasks.len(),
            batch_id,
            batch.severity
        )
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

impl PromptBuilder for XmlPromptBuilder {
    fn build(&self, repo: &RepoRef, batch_id: &str, batch: &Batch) -> String {
        let rule = escape(batch_id);
        let repo_name = escape(&repo.to_string());

        let mut vulnerabilities = String::new();
        for task in &batch.tasks {
            let line = task
                .line
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = write!(
                vulnerabilities,
                "\n    <vulnerability>\
                 \n      <rule>{}</rule>\
                 \n      <file>{}</file>\
                 \n      <line>{}</line>\
                 \n      <source>{}</source>\
                 \n      <alert_number>{}</alert_number>\
                 \n    </vulnerability>",
                rule,
                escape(&task.file),
                line,
                escape(task.source.as_deref().unwrap_or("N/A")),
                task.alert_number
            );
        }

        format!(
            r#"<security_remediation_task>
  <metadata>
    <batch_id>{rule}</batch_id>
    <repository>{repo_name}</repository>
    <task_type>vulnerability_remediation</task_type>
  </metadata>

  <description>
    {description}
  </description>

  <vulnerabilities>{vulnerabilities}
  </vulnerabilities>

  <instructions>
    <step>1. Clone the repository {repo_name} if not already available</step>
    <step>2. Analyze each vulnerability location listed above</step>
    <step>3. Implement secure fixes for all vulnerabilities in this batch</step>
    <step>4. Ensure fixes follow security best practices (input validation, parameterized queries, etc.)</step>
    <step>5. Run all existing tests to verify fixes don't break functionality</step>
    <step>6. Create a new branch named 'security-fix/{rule}'</step>
    <step>7. Commit all changes with descriptive commit messages</step>
    <step>8. Open a GitHub Pull Request with title: 'Security Fix: {rule}'</step>
    <step>9. Include a summary of all fixes in the PR description</step>
  </instructions>

  <requirements>
    <requirement>All vulnerabilities in this batch must be addressed</requirement>
    <requirement>Tests must pass after fixes are applied</requirement>
    <requirement>PR must be created and ready for review</requirement>
  </requirements>
</security_remediation_task>"#,
            description = escape(&Self::description(batch_id, batch)),
        )
    }
}
