//! Prompt to source-code generation.

/// Remote and local generation backends.
pub mod client;
/// Default project naming derived from prompts.
pub mod naming;

pub use client::{GenerationClient, GenerationRequest, GenerationResponse};
pub use naming::default_name;

use crate::error::{LifecycleError, Result};

/// Longest prompt fragment embedded into the window caption.
pub const MAX_TITLE_CHARS: usize = 50;

/// Caption used when the prompt yields no usable fragment.
pub const DEFAULT_TITLE: &str = "Custom Game";

/// Turn a game description into a runnable Pygame program.
///
/// Output depends only on the caption fragment of the prompt, so identical
/// prompts always produce byte-identical code.
pub fn generate(prompt: &str) -> Result<String> {
    if prompt.trim().is_empty() {
        return Err(LifecycleError::validation(
            "Please enter a game description",
        ));
    }
    let title = escape_python_string(&title_fragment(prompt));
    Ok(game_template(&title))
}

/// First [`MAX_TITLE_CHARS`] characters of the prompt as typed, or
/// [`DEFAULT_TITLE`] when those are all whitespace.
pub fn title_fragment(prompt: &str) -> String {
    let fragment: String = prompt.chars().take(MAX_TITLE_CHARS).collect();
    if fragment.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        fragment
    }
}

fn escape_python_string(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn game_template(title: &str) -> String {
    format!(
        r#"import pygame
import random

# Initialize Pygame
pygame.init()

# Set up the display
WIDTH = 800
HEIGHT = 600
screen = pygame.display.set_mode((WIDTH, HEIGHT))
pygame.display.set_caption("Vibr Game - {title}")

# Colors
WHITE = (255, 255, 255)
BLACK = (0, 0, 0)
BLUE = (0, 0, 255)
RED = (255, 0, 0)
GREEN = (0, 255, 0)

# Player
player_x = WIDTH // 2
player_y = HEIGHT // 2
player_speed = 5

# Game loop
running = True
clock = pygame.time.Clock()

while running:
    for event in pygame.event.get():
        if event.type == pygame.QUIT:
            running = False

    # Handle input
    keys = pygame.key.get_pressed()
    if keys[pygame.K_LEFT]:
        player_x -= player_speed
    if keys[pygame.K_RIGHT]:
        player_x += player_speed
    if keys[pygame.K_UP]:
        player_y -= player_speed
    if keys[pygame.K_DOWN]:
        player_y += player_speed

    # Keep player on screen
    player_x = max(0, min(WIDTH - 50, player_x))
    player_y = max(0, min(HEIGHT - 50, player_y))

    # Clear screen
    screen.fill(WHITE)

    # Draw player
    pygame.draw.rect(screen, BLUE, (player_x, player_y, 50, 50))

    # Draw instructions
    font = pygame.font.Font(None, 36)
    text = font.render("Use arrow keys to move", True, BLACK)
    screen.blit(text, (10, 10))

    # Draw game title
    title = font.render("Vibr Game", True, GREEN)
    screen.blit(title, (10, 50))

    # Update display
    pygame.display.flip()
    clock.tick(60)

pygame.quit()
"#
    )
}
