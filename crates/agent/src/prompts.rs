use serde_json::{json, Value};

/// Default system prompt for the planner role.
pub const PLANNER_SYSTEM: &str = "\
You are a planner. You carry out a web browsing task through two helper agents, \
using the functions ask_html_assistant (answers questions about the current page; \
it cannot modify the page) and ask_code_generator (generates and executes browser \
automation code). The code generator cannot see the page, so first fetch relevant \
HTML through ask_html_assistant and pass it to the code generator as context_html; \
pass an empty string when no context is needed. Provide actual HTML fragments, not \
selectors. Work on one step at a time instead of writing out the whole plan, and \
keep each request as granular as possible. If a step fails, fix it before moving \
on. Dismiss cookie notices and other popups when they appear. When a call to \
ask_code_generator comes back with TERMINATE, that step's code was generated and \
executed successfully. When the whole task has been completed, reply with FINISHED.";

/// Default system prompt for the HTML assistant role.
pub const HTML_ASSISTANT_SYSTEM: &str = "\
You are a helpful assistant answering questions about HTML code. Respond only \
with HTML taken from the HTML provided to you; never invent markup that is not \
there.";

/// Default system prompt for the code generator role.
pub const CODE_GENERATOR_SYSTEM: &str = "\
You are a Javascript engineer. You generate puppeteer code to fulfill web \
browsing tasks, and you may be asked to correct code. Reply only with code \
inside code blocks. Assume the environment is already initialized with:\n\
const browser = await puppeteer.launch({ headless: false });\n\
const page = await browser.newPage();\n\
Use the { waitUntil: 'networkidle0' } option when navigating so pages load \
fully. Click an input field before typing into it. If you get a 'Node is \
either not clickable or not an Element' error and there is nothing else to \
click, reply with NOT_CLICKABLE <element_name>. When you see success:true in \
an execution result, reply with TERMINATE.";

/// Function schemas the planner may call, in the OpenAI tools format.
pub fn planner_functions() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": "ask_html_assistant",
                "description": "ask a question about the HTML of the current page in the browser",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "the question to ask about the current page"
                        }
                    },
                    "required": ["message"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "ask_code_generator",
                "description": "ask the code generator to generate and execute browser automation code",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "the task for the code generator"
                        },
                        "context_html": {
                            "type": "string",
                            "description": "relevant HTML from the current page"
                        }
                    },
                    "required": ["message"]
                }
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_functions_shape() {
        let functions = planner_functions();
        assert_eq!(functions.len(), 2);
        for f in &functions {
            assert_eq!(f["type"], "function");
            assert!(f["function"]["name"].is_string());
            assert!(f["function"]["parameters"]["required"]
                .as_array()
                .unwrap()
                .contains(&json!("message")));
        }
    }
}
