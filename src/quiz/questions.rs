use crate::quiz::{AnswerOption, Question};

// Every option is scored on the 0..=20 scale the analysis fallback assumes.
pub fn bundled() -> Vec<Question> {
    vec![
        Question::new(
            "Courage",
            "You see a stranger being bullied on the street. What do you do?",
            vec![
                AnswerOption::new("Step in and stand next to them", 20),
                AnswerOption::new("Call for help right away", 15),
                AnswerOption::new("Check on them after it's over", 10),
                AnswerOption::new("Walk past, it's not my business", 0),
            ],
        ),
        Question::new(
            "Honesty",
            "The cashier gives you too much change. What do you do?",
            vec![
                AnswerOption::new("Give it back immediately", 20),
                AnswerOption::new("Give it back if I notice before leaving", 15),
                AnswerOption::new("Keep it, but feel bad about it", 5),
                AnswerOption::new("Keep it, their mistake", 0),
            ],
        ),
        Question::new(
            "Compassion",
            "A classmate is struggling and falling behind. How do you react?",
            vec![
                AnswerOption::new("Offer to study together", 20),
                AnswerOption::new("Share my notes with them", 15),
                AnswerOption::new("Tell a teacher they need help", 10),
                AnswerOption::new("Focus on my own grades", 0),
            ],
        ),
        Question::new(
            "Responsibility",
            "Your team project fails because of a mistake you made. What do you do?",
            vec![
                AnswerOption::new("Own it and propose a fix", 20),
                AnswerOption::new("Admit it when someone asks", 10),
                AnswerOption::new("Say it was a team failure", 5),
                AnswerOption::new("Blame the circumstances", 0),
            ],
        ),
        Question::new(
            "Perseverance",
            "You failed an important exam. What's your next step?",
            vec![
                AnswerOption::new("Review what went wrong and try again", 20),
                AnswerOption::new("Ask someone to help me prepare", 15),
                AnswerOption::new("Take a long break from the subject", 5),
                AnswerOption::new("Give up on it", 0),
            ],
        ),
    ]
}
