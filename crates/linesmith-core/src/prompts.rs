//! Prompts for matchup analysis

use crate::analysis::Matchup;
use crate::tools::CODE_TOOL_NAME;

pub fn system_prompt(search_tool: &str) -> String {
    format!(
        r#"You are an expert NFL betting analyst with access to web search and Python code execution.

IMPORTANT TOOL USAGE RULES:
1. When calling {search}, you MUST always include a "query" parameter with your search query
2. Example: {search}(query="NFL betting odds Chiefs vs Colts week 12")
3. When calling {code}, include complete Python code with proper imports
4. Always generate charts using matplotlib with plt.savefig()

Do not make up information. Use the tools to gather real data."#,
        search = search_tool,
        code = CODE_TOOL_NAME,
    )
}

pub fn user_prompt(matchup: &Matchup, search_tool: &str) -> String {
    let Matchup {
        home_team,
        away_team,
        week,
    } = matchup;

    format!(
        r#"Analyze this NFL game for betting opportunities:

**Game:** {home_team} vs {away_team}
**Week:** {week}

Step-by-step process:
1. Search for current betting lines (spread, total, moneyline) using {search} with query: "{home_team} vs {away_team} betting odds week {week}"
2. Search for injuries and news using {search}
3. Search for weather conditions if relevant
4. Use {code} to create data visualizations and statistical analysis
5. Provide your analysis in markdown format with betting recommendations

REMEMBER: All {search} calls MUST include the "query" parameter!"#,
        search = search_tool,
        code = CODE_TOOL_NAME,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_tools() {
        let prompt = system_prompt("brave_web_search");
        assert!(prompt.contains("When calling brave_web_search, you MUST"));
        assert!(prompt.contains("When calling run_python_code"));
        assert!(prompt.contains("plt.savefig()"));
    }

    #[test]
    fn test_user_prompt_embeds_matchup() {
        let matchup = Matchup::new("Minnesota Vikings", "Green Bay Packers", 12);
        let prompt = user_prompt(&matchup, "brave_web_search");
        assert!(prompt.contains("**Game:** Minnesota Vikings vs Green Bay Packers"));
        assert!(prompt.contains("**Week:** 12"));
        assert!(prompt.contains(r#"query: "Minnesota Vikings vs Green Bay Packers betting odds week 12""#));
        assert!(prompt.ends_with(r#"MUST include the "query" parameter!"#));
    }
}
