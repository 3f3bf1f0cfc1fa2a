use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use env_logger::Env;

use bgm_merger::{
    MergerConfig, OggDurationProbe,
    dialogue_extractor::{dialogues_to_json, extract_dialogues_from_file},
    merge_script, merge_with_channel, render_script,
    script_merger::{read_script_lines, write_script},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 将合并脚本中的 PS3 BGM 指令插入原脚本
    Merge {
        /// 已合并 PS3 XML 的脚本路径
        #[arg(short, long)]
        input: PathBuf,

        /// 输出的脚本路径。如果未提供，结果将打印到标准输出。
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML 配置文件路径
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 直接指定 BGM 通道，跳过自动检测
        #[arg(long)]
        bgm_channel: Option<u32>,
    },
    /// 列出 PS3 XML 文件中的对话指令
    Dialogues {
        /// PS3 XML 文件路径
        #[arg(short, long)]
        input: PathBuf,

        /// 输出一个包含所有对话指令的 JSON 文件路径
        #[arg(long)]
        json_output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            input,
            output,
            config,
            bgm_channel,
        } => run_merge(&input, output, config, bgm_channel),
        Commands::Dialogues { input, json_output } => run_dialogues(&input, json_output),
    }
}

fn run_merge(
    input: &Path,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
    bgm_channel: Option<u32>,
) {
    // --- 1. 读取配置 ---
    let config = match config_path {
        Some(path) => match MergerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("无法读取配置文件 {:?}: {}", path, e);
                process::exit(1);
            }
        },
        None => MergerConfig::default(),
    };

    // --- 2. 读取合并脚本 ---
    let lines = match read_script_lines(input) {
        Ok(lines) => lines,
        Err(e) => {
            log::error!("无法读取输入文件 {:?}: {}", input, e);
            process::exit(1);
        }
    };

    // --- 3. 合并 ---
    log::info!("--------- 开始向原脚本插入 BGM ---------");
    let merged = match bgm_channel {
        Some(channel) => {
            log::info!("使用指定的 BGM 通道 [{}]", channel);
            merge_with_channel(&lines, channel, config.line_ending)
        }
        None => merge_script(&lines, &config, &OggDurationProbe),
    };
    let instructions = match merged {
        Ok(instructions) => instructions,
        Err(e) => {
            log::error!("合并脚本 {:?} 失败: {}", input, e);
            process::exit(1);
        }
    };

    // --- 4. 输出结果 ---
    match output {
        Some(output_path) => {
            log::info!("正在将结果写入文件: {:?}", output_path);
            if let Err(e) = write_script(&output_path, &instructions, config.line_ending) {
                log::error!("写入输出文件 {:?} 失败: {}", output_path, e);
                process::exit(1);
            }
            log::info!("处理成功！输出文件已保存。");
        }
        None => {
            let script = render_script(&instructions, config.line_ending);
            if let Err(e) = io::stdout().write_all(script.as_bytes()) {
                log::error!("写入标准输出失败: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_dialogues(input: &Path, json_output: Option<PathBuf>) {
    let dialogues = match extract_dialogues_from_file(input) {
        Ok(dialogues) => dialogues,
        Err(e) => {
            log::error!("解析 PS3 XML 文件 {:?} 失败: {}", input, e);
            process::exit(1);
        }
    };
    log::info!("共找到 {} 条对话指令。", dialogues.len());

    let json_string = match dialogues_to_json(&dialogues) {
        Ok(s) => s,
        Err(e) => {
            log::error!("序列化对话指令到 JSON 失败: {}", e);
            process::exit(1);
        }
    };

    match json_output {
        Some(json_output_path) => {
            if let Err(e) = fs::write(&json_output_path, json_string) {
                log::error!("写入 JSON 文件 {:?} 失败: {}", json_output_path, e);
                process::exit(1);
            }
        }
        None => println!("{json_string}"),
    }
}
