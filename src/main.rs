mod config;
mod quiz;

use std::sync::Arc;

use config::Config;
use dotenv::dotenv;
use quiz::{
    analysis::HeroAnalyst,
    generator::generator_from_config,
    questions,
    session::{Advance, Screen, Session},
    Question,
};
use teloxide::{
    dispatching::{dialogue::InMemStorage, UpdateHandler},
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup, KeyboardRemove},
    utils::command::BotCommands,
};

type QuizDialogue = Dialogue<Session, InMemStorage<Session>>;
type HandlerError = Box<dyn std::error::Error + Send + Sync>;
type HandlerResult = Result<(), HandlerError>;
type QuestionBank = Arc<Vec<Question>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum Command {
    #[command(description = "start the quiz.")]
    Start,
    #[command(description = "drop the current quiz and start over.")]
    Restart,
    #[command(description = "show this text.")]
    Help,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();

    // Without a key there is no analysis and no bot.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::debug!("Loaded {:?}", config);

    let generator = match generator_from_config(&config) {
        Ok(generator) => generator,
        Err(e) => {
            log::error!("Unable to set up the analysis service: {}", e);
            std::process::exit(1);
        }
    };
    let analyst = Arc::new(HeroAnalyst::new(generator));
    let bank: QuestionBank = Arc::new(questions::bundled());

    log::info!("Starting hero quiz bot with {} questions...", bank.len());
    let bot = Bot::from_env();

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![InMemStorage::<Session>::new(), analyst, bank])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<HandlerError> {
    let commands = teloxide::filter_command::<Command, _>().endpoint(handle_command);

    Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<Session>, Session>()
        .branch(commands)
        .branch(dptree::case![Session::Welcome { name }].endpoint(receive_name))
        .branch(
            dptree::case![Session::Playing {
                name,
                index,
                answers
            }]
            .endpoint(receive_answer),
        )
        .branch(dptree::case![Session::Loading { name, answers }].endpoint(still_loading))
        .branch(dptree::case![Session::Results { name, result }].endpoint(receive_after_results))
}

const GREETING_TEXT: &str = "Hi! This is the Hero Quiz. How much of a hero is hiding in you? \
Answer 5 questions to find out. First, what's your name?";
const ASK_NAME_TEXT: &str = "Please type your name (as text)";
const CHOOSE_OPTION_TEXT: &str = "Please choose one of the options";
const LOADING_TEXT: &str = "Analyzing your answers... Please wait a moment.";
const RESTART_BUTTON: &str = "Take the quiz again";

async fn handle_command(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: Session,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start | Command::Restart => {
            log::info!("Chat {} restarts from the {} phase", msg.chat.id.0, session.phase());
            session.restart();
            dialogue.update(session).await?;
            bot.send_message(msg.chat.id, GREETING_TEXT)
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
    }
    Ok(())
}

async fn receive_name(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: Session,
    bank: QuestionBank,
    msg: Message,
) -> HandlerResult {
    let Some(name) = msg.text() else {
        bot.send_message(msg.chat.id, ASK_NAME_TEXT).await?;
        return Ok(());
    };

    session.set_name(name)?;
    if !session.start() {
        bot.send_message(msg.chat.id, ASK_NAME_TEXT).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, format!("Nice to meet you, {}! Let's begin.", name))
        .await?;
    dialogue.update(session.clone()).await?;
    send_screen(&bot, msg.chat.id, &session, &bank).await
}

async fn receive_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: Session,
    bank: QuestionBank,
    analyst: Arc<HeroAnalyst>,
    msg: Message,
) -> HandlerResult {
    let Some(option) = msg.text().and_then(|text| option_index(&session, &bank, text)) else {
        bot.send_message(msg.chat.id, CHOOSE_OPTION_TEXT).await?;
        return send_screen(&bot, msg.chat.id, &session, &bank).await;
    };

    match session.select_option(&bank, option)? {
        Advance::Next => {
            dialogue.update(session.clone()).await?;
            send_screen(&bot, msg.chat.id, &session, &bank).await
        }
        Advance::Analyze(pending) => {
            dialogue.update(session.clone()).await?;
            send_screen(&bot, msg.chat.id, &session, &bank).await?;

            // Nice to have; the analysis goes ahead even if this fails
            let _ = bot
                .send_chat_action(msg.chat.id, ChatAction::Typing)
                .await;

            let result = analyst.analyze(&pending.name, &pending.answers).await;
            log::info!(
                "Chat {} finished the quiz with {}%",
                msg.chat.id.0,
                result.percentage
            );
            session.complete(result)?;

            dialogue.update(session.clone()).await?;
            send_screen(&bot, msg.chat.id, &session, &bank).await
        }
    }
}

/// Updates from one chat are handled one at a time, so messages sent while
/// `receive_answer` awaits the analysis arrive after the session reaches
/// `Results`. This only runs when the stored state was left in `Loading`, e.g.
/// after a failed Telegram call in `receive_answer`.
async fn still_loading(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, LOADING_TEXT).await?;
    Ok(())
}

async fn receive_after_results(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: Session,
    bank: QuestionBank,
    msg: Message,
) -> HandlerResult {
    if msg.text() == Some(RESTART_BUTTON) {
        session.restart();
        dialogue.update(session).await?;
        bot.send_message(msg.chat.id, GREETING_TEXT)
            .reply_markup(KeyboardRemove::new())
            .await?;
        return Ok(());
    }
    send_screen(&bot, msg.chat.id, &session, &bank).await
}

async fn send_screen(
    bot: &Bot,
    chat_id: ChatId,
    session: &Session,
    bank: &[Question],
) -> HandlerResult {
    match session.screen(bank) {
        Screen::Welcome { .. } => {
            bot.send_message(chat_id, GREETING_TEXT).await?;
        }
        Screen::Playing {
            question: Some(question),
            number,
            total,
            progress,
        } => {
            let keyboard = KeyboardMarkup::new(
                question
                    .options
                    .iter()
                    .map(|o| vec![KeyboardButton::new(o.text.clone())])
                    .collect::<Vec<_>>(),
            );
            bot.send_message(chat_id, question_text(question, number, total, progress))
                .reply_markup(keyboard)
                .await?;
        }
        Screen::Playing { question: None, .. } => {
            log::error!("Chat {} is past the end of the question bank", chat_id.0);
        }
        Screen::Loading => {
            bot.send_message(chat_id, LOADING_TEXT)
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        Screen::Results {
            name,
            percentage,
            analysis,
        } => {
            let keyboard =
                KeyboardMarkup::new(vec![vec![KeyboardButton::new(RESTART_BUTTON)]]);
            bot.send_message(chat_id, results_text(name, percentage, analysis))
                .reply_markup(keyboard)
                .await?;
        }
    }
    Ok(())
}

/// Position of the option whose label matches what the user sent.
fn option_index(session: &Session, bank: &[Question], text: &str) -> Option<usize> {
    let Screen::Playing {
        question: Some(question),
        ..
    } = session.screen(bank)
    else {
        return None;
    };
    question
        .options
        .iter()
        .position(|o| o.text == text.trim())
}

fn question_text(question: &Question, number: usize, total: usize, progress: f64) -> String {
    format!(
        "Question {} / {} · {}\n{}\n\n{}",
        number,
        total,
        question.r#trait,
        progress_bar(progress),
        question.text
    )
}

fn results_text(name: &str, percentage: u32, analysis: &str) -> String {
    format!(
        "Analysis for {}\nYou have the qualities of a hero:\n\n{}%\n\n{}",
        name, percentage, analysis
    )
}

const PROGRESS_CELLS: usize = 10;

fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * PROGRESS_CELLS as f64).round()) as usize;
    format!(
        "{}{} {}%",
        "▓".repeat(filled),
        "░".repeat(PROGRESS_CELLS - filled),
        (progress.clamp(0.0, 1.0) * 100.0).round()
    )
}
