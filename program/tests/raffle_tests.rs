use raffle::{
    process_instruction, process_vrf_instruction,
    raffle_error::RaffleError,
    raffle_instruction::{self, RaffleInstruction},
    raffle_state::{Raffle, RaffleState, MAX_PLAYERS},
    state::AccountData,
    vrf_coordinator_mock,
    vrf_error::VrfError,
    vrf_instruction,
    vrf_state::{find_config_address, find_request_address, find_subscription_address, CoordinatorConfig, Subscription},
};
use solana_program_test::*;
use solana_sdk::{
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    sysvar::clock::Clock,
    transaction::{Transaction, TransactionError},
};

const ENTRANCE_FEE: u64 = 100_000_000;
const INTERVAL: u64 = 30;
const CALLBACK_GAS_LIMIT: u32 = 500_000;
const BASE_FEE: u64 = 250_000_000_000_000_000;
const GAS_PRICE_LINK: u64 = 1_000_000_000;
const FUND_AMOUNT: u64 = 1_000_000_000_000_000_000;
const GAS_LANE: [u8; 32] = [7u8; 32];

struct TestEnv {
    context: ProgramTestContext,
    raffle: Keypair,
    subscription_id: u64,
}

fn program_test() -> ProgramTest {
    let mut program_test = ProgramTest::new("raffle", raffle::id(), processor!(process_instruction));
    program_test.add_program(
        "vrf_coordinator_mock",
        vrf_coordinator_mock::id(),
        processor!(process_vrf_instruction),
    );
    program_test.prefer_bpf(false);
    program_test
}

async fn send(context: &mut ProgramTestContext, instructions: &[Instruction], signers: &[&Keypair]) -> Result<(), TransactionError> {
    let blockhash = context
        .banks_client
        .get_new_latest_blockhash(&context.last_blockhash)
        .await
        .unwrap();
    context.last_blockhash = blockhash;
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    let transaction = Transaction::new_signed_with_payer(
        instructions,
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .map_err(|err| err.unwrap())
}

fn custom(code: u32) -> TransactionError {
    TransactionError::InstructionError(0, InstructionError::Custom(code))
}

async fn coordinator_config(context: &mut ProgramTestContext) -> CoordinatorConfig {
    let (config, _) = find_config_address(&vrf_coordinator_mock::id());
    let account = context.banks_client.get_account(config).await.unwrap().unwrap();
    CoordinatorConfig::unpack(&account.data).unwrap()
}

async fn raffle_state(context: &mut ProgramTestContext, raffle: &Pubkey) -> Raffle {
    let account = context.banks_client.get_account(*raffle).await.unwrap().unwrap();
    Raffle::unpack(&account.data).unwrap()
}

async fn lamports(context: &mut ProgramTestContext, key: &Pubkey) -> u64 {
    context.banks_client.get_balance(*key).await.unwrap()
}

/// Coordinator configured, subscription funded, raffle deployed and registered as consumer
async fn setup() -> TestEnv {
    setup_with_funding(FUND_AMOUNT).await
}

async fn setup_with_funding(fund_amount: u64) -> TestEnv {
    let mut context = program_test().start_with_context().await;
    let coordinator = vrf_coordinator_mock::id();
    let payer = context.payer.pubkey();

    send(
        &mut context,
        &[vrf_instruction::initialize(&coordinator, &payer, BASE_FEE, GAS_PRICE_LINK)],
        &[],
    )
    .await
    .unwrap();

    let subscription_id = coordinator_config(&mut context).await.next_subscription_id;
    send(
        &mut context,
        &[
            vrf_instruction::create_subscription(&coordinator, &payer, subscription_id),
            vrf_instruction::fund_subscription(&coordinator, &payer, subscription_id, fund_amount),
        ],
        &[],
    )
    .await
    .unwrap();

    let raffle = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    send(
        &mut context,
        &[
            system_instruction::create_account(
                &payer,
                &raffle.pubkey(),
                rent.minimum_balance(Raffle::LEN),
                Raffle::LEN as u64,
                &raffle::id(),
            ),
            raffle_instruction::initialize(
                &raffle::id(),
                &payer,
                &raffle.pubkey(),
                &coordinator,
                subscription_id,
                GAS_LANE,
                INTERVAL,
                ENTRANCE_FEE,
                CALLBACK_GAS_LIMIT,
            ),
            vrf_instruction::add_consumer(&coordinator, &payer, subscription_id, &raffle.pubkey()),
        ],
        &[&raffle],
    )
    .await
    .unwrap();

    TestEnv {
        context,
        raffle,
        subscription_id,
    }
}

async fn funded_player(context: &mut ProgramTestContext) -> Keypair {
    let player = Keypair::new();
    let payer = context.payer.pubkey();
    send(
        context,
        &[system_instruction::transfer(&payer, &player.pubkey(), 10 * ENTRANCE_FEE)],
        &[],
    )
    .await
    .unwrap();
    player
}

async fn enter(env: &mut TestEnv, player: &Keypair, amount: u64) -> Result<(), TransactionError> {
    let ix = raffle_instruction::enter_raffle(&raffle::id(), &player.pubkey(), &env.raffle.pubkey(), amount);
    send(&mut env.context, &[ix], &[player]).await
}

async fn advance_past_interval(context: &mut ProgramTestContext) {
    let mut clock: Clock = context.banks_client.get_sysvar().await.unwrap();
    clock.unix_timestamp += INTERVAL as i64 + 1;
    context.set_sysvar(&clock);
}

async fn perform_upkeep(env: &mut TestEnv) -> Result<u64, TransactionError> {
    let next_request_id = coordinator_config(&mut env.context).await.next_request_id;
    let payer = env.context.payer.pubkey();
    let ix = raffle_instruction::perform_upkeep(
        &raffle::id(),
        &payer,
        &env.raffle.pubkey(),
        &vrf_coordinator_mock::id(),
        env.subscription_id,
        next_request_id,
    );
    send(&mut env.context, &[ix], &[]).await.map(|_| next_request_id)
}

#[tokio::test]
async fn test_initialize_stores_constructor_parameters() {
    let mut env = setup().await;
    let raffle = raffle_state(&mut env.context, &env.raffle.pubkey()).await;

    assert!(raffle.is_initialized);
    assert_eq!(raffle.state, RaffleState::Open);
    assert_eq!(raffle.entrance_fee, ENTRANCE_FEE);
    assert_eq!(raffle.interval, INTERVAL);
    assert_eq!(raffle.vrf_coordinator, vrf_coordinator_mock::id());
    assert_eq!(raffle.subscription_id, env.subscription_id);
    assert_eq!(raffle.gas_lane, GAS_LANE);
    assert_eq!(raffle.callback_gas_limit, CALLBACK_GAS_LIMIT);
    assert_eq!(raffle.num_players(), 0);
    assert_eq!(raffle.recent_winner, Pubkey::default());

    let payer = env.context.payer.pubkey();
    let again = raffle_instruction::initialize(
        &raffle::id(),
        &payer,
        &env.raffle.pubkey(),
        &vrf_coordinator_mock::id(),
        env.subscription_id,
        GAS_LANE,
        INTERVAL,
        ENTRANCE_FEE,
        CALLBACK_GAS_LIMIT,
    );
    assert_eq!(
        send(&mut env.context, &[again], &[]).await.unwrap_err(),
        custom(RaffleError::AlreadyInitialized as u32)
    );
}

#[tokio::test]
async fn test_subscription_is_funded_and_lists_raffle() {
    let mut env = setup().await;
    let (address, _) = find_subscription_address(&vrf_coordinator_mock::id(), env.subscription_id);
    let account = env.context.banks_client.get_account(address).await.unwrap().unwrap();
    let subscription = Subscription::unpack(&account.data).unwrap();

    assert_eq!(subscription.owner, env.context.payer.pubkey());
    assert_eq!(subscription.balance, FUND_AMOUNT);
    assert!(subscription.is_consumer(&env.raffle.pubkey()));

    let config = coordinator_config(&mut env.context).await;
    assert_eq!(config.next_subscription_id, env.subscription_id + 1);
}

#[tokio::test]
async fn test_coordinator_cannot_be_initialized_twice() {
    let mut env = setup().await;
    let payer = env.context.payer.pubkey();
    let ix = vrf_instruction::initialize(&vrf_coordinator_mock::id(), &payer, 1, 1);
    assert_eq!(
        send(&mut env.context, &[ix], &[]).await.unwrap_err(),
        custom(VrfError::AlreadyInitialized as u32)
    );
}

#[tokio::test]
async fn test_only_owner_can_add_consumer() {
    let mut env = setup().await;
    let stranger = funded_player(&mut env.context).await;
    let ix = vrf_instruction::add_consumer(
        &vrf_coordinator_mock::id(),
        &stranger.pubkey(),
        env.subscription_id,
        &Pubkey::new_unique(),
    );
    assert_eq!(
        send(&mut env.context, &[ix], &[&stranger]).await.unwrap_err(),
        custom(VrfError::MustBeSubOwner as u32)
    );
}

#[tokio::test]
async fn test_enter_rejects_underpayment_and_records_player() {
    let mut env = setup().await;
    let player = funded_player(&mut env.context).await;

    assert_eq!(
        enter(&mut env, &player, ENTRANCE_FEE - 1).await.unwrap_err(),
        custom(RaffleError::NotEnoughFundsEntered as u32)
    );

    let before = lamports(&mut env.context, &env.raffle.pubkey()).await;
    enter(&mut env, &player, ENTRANCE_FEE).await.unwrap();

    let raffle = raffle_state(&mut env.context, &env.raffle.pubkey()).await;
    assert_eq!(raffle.player(0).unwrap(), player.pubkey());
    assert_eq!(lamports(&mut env.context, &env.raffle.pubkey()).await, before + ENTRANCE_FEE);
}

#[tokio::test]
async fn test_upkeep_not_needed_without_players() {
    let mut env = setup().await;
    advance_past_interval(&mut env.context).await;
    assert_eq!(
        perform_upkeep(&mut env).await.unwrap_err(),
        custom(RaffleError::UpkeepNotNeeded as u32)
    );
}

#[tokio::test]
async fn test_upkeep_closes_round_and_blocks_entries() {
    let mut env = setup().await;
    let player = funded_player(&mut env.context).await;
    enter(&mut env, &player, ENTRANCE_FEE).await.unwrap();
    advance_past_interval(&mut env.context).await;

    let request_id = perform_upkeep(&mut env).await.unwrap();
    assert!(request_id > 0);

    let raffle = raffle_state(&mut env.context, &env.raffle.pubkey()).await;
    assert_eq!(raffle.state, RaffleState::Calculating);
    assert_eq!(raffle.pending_request_id, request_id);

    let (request, _) = find_request_address(&vrf_coordinator_mock::id(), request_id);
    assert!(env.context.banks_client.get_account(request).await.unwrap().is_some());

    assert_eq!(
        enter(&mut env, &player, ENTRANCE_FEE).await.unwrap_err(),
        custom(RaffleError::NotOpen as u32)
    );
}

#[tokio::test]
async fn test_fulfill_pays_winner_and_reopens() {
    let mut env = setup().await;
    let players = [
        funded_player(&mut env.context).await,
        funded_player(&mut env.context).await,
        funded_player(&mut env.context).await,
    ];
    for player in &players {
        enter(&mut env, player, ENTRANCE_FEE).await.unwrap();
    }
    advance_past_interval(&mut env.context).await;
    let request_id = perform_upkeep(&mut env).await.unwrap();

    let candidates: Vec<Pubkey> = players.iter().map(|player| player.pubkey()).collect();
    let balance_before = lamports(&mut env.context, &candidates[1]).await;
    let payer = env.context.payer.pubkey();
    // word 4 picks index 4 % 3 = 1
    let ix = vrf_instruction::fulfill_random_words_with_override(
        &vrf_coordinator_mock::id(),
        &payer,
        request_id,
        env.subscription_id,
        &raffle::id(),
        &env.raffle.pubkey(),
        &candidates,
        vec![4],
    );
    send(&mut env.context, &[ix], &[]).await.unwrap();

    let raffle = raffle_state(&mut env.context, &env.raffle.pubkey()).await;
    assert_eq!(raffle.recent_winner, candidates[1]);
    assert_eq!(raffle.state, RaffleState::Open);
    assert_eq!(raffle.num_players(), 0);
    assert!(!raffle.has_pending_request());
    assert_eq!(
        lamports(&mut env.context, &candidates[1]).await,
        balance_before + 3 * ENTRANCE_FEE
    );

    let (request, _) = find_request_address(&vrf_coordinator_mock::id(), request_id);
    assert!(env.context.banks_client.get_account(request).await.unwrap().is_none());
}

#[tokio::test]
async fn test_fulfill_unknown_request_fails() {
    let mut env = setup().await;
    let payer = env.context.payer.pubkey();
    for request_id in [0, 1] {
        let ix = vrf_instruction::fulfill_random_words(
            &vrf_coordinator_mock::id(),
            &payer,
            request_id,
            env.subscription_id,
            &raffle::id(),
            &env.raffle.pubkey(),
            &[],
        );
        assert_eq!(
            send(&mut env.context, &[ix], &[]).await.unwrap_err(),
            custom(VrfError::NonexistentRequest as u32)
        );
    }
}

#[tokio::test]
async fn test_override_must_match_requested_word_count() {
    let mut env = setup().await;
    let player = funded_player(&mut env.context).await;
    enter(&mut env, &player, ENTRANCE_FEE).await.unwrap();
    advance_past_interval(&mut env.context).await;
    let request_id = perform_upkeep(&mut env).await.unwrap();

    let payer = env.context.payer.pubkey();
    let ix = vrf_instruction::fulfill_random_words_with_override(
        &vrf_coordinator_mock::id(),
        &payer,
        request_id,
        env.subscription_id,
        &raffle::id(),
        &env.raffle.pubkey(),
        &[player.pubkey()],
        vec![1, 2],
    );
    assert_eq!(
        send(&mut env.context, &[ix], &[]).await.unwrap_err(),
        custom(VrfError::InvalidNumWords as u32)
    );
}

#[tokio::test]
async fn test_missing_winner_account_reverts_fulfillment() {
    let mut env = setup().await;
    let player = funded_player(&mut env.context).await;
    enter(&mut env, &player, ENTRANCE_FEE).await.unwrap();
    advance_past_interval(&mut env.context).await;
    let request_id = perform_upkeep(&mut env).await.unwrap();

    let payer = env.context.payer.pubkey();
    let ix = vrf_instruction::fulfill_random_words(
        &vrf_coordinator_mock::id(),
        &payer,
        request_id,
        env.subscription_id,
        &raffle::id(),
        &env.raffle.pubkey(),
        &[],
    );
    assert_eq!(
        send(&mut env.context, &[ix], &[]).await.unwrap_err(),
        custom(RaffleError::TransferFailed as u32)
    );

    let raffle = raffle_state(&mut env.context, &env.raffle.pubkey()).await;
    assert_eq!(raffle.state, RaffleState::Calculating);
    assert_eq!(raffle.num_players(), 1);
    let (request, _) = find_request_address(&vrf_coordinator_mock::id(), request_id);
    assert!(env.context.banks_client.get_account(request).await.unwrap().is_some());
}

#[tokio::test]
async fn test_only_coordinator_can_fulfill() {
    let mut env = setup().await;
    let player = funded_player(&mut env.context).await;
    enter(&mut env, &player, ENTRANCE_FEE).await.unwrap();
    advance_past_interval(&mut env.context).await;
    let request_id = perform_upkeep(&mut env).await.unwrap();

    let impostor = Keypair::new();
    let ix = Instruction {
        program_id: raffle::id(),
        accounts: vec![
            AccountMeta::new_readonly(impostor.pubkey(), true),
            AccountMeta::new(env.raffle.pubkey(), false),
            AccountMeta::new(player.pubkey(), false),
        ],
        data: RaffleInstruction::FulfillRandomWords {
            request_id,
            random_words: vec![0],
        }
        .pack(),
    };
    assert_eq!(
        send(&mut env.context, &[ix], &[&impostor]).await.unwrap_err(),
        custom(RaffleError::OnlyCoordinatorCanFulfill as u32)
    );

    let raffle = raffle_state(&mut env.context, &env.raffle.pubkey()).await;
    assert_eq!(raffle.state, RaffleState::Calculating);
    assert_eq!(raffle.pending_request_id, request_id);
}

#[tokio::test]
async fn test_enter_rejected_when_raffle_is_full() {
    let mut env = setup().await;
    let player = Keypair::new();
    let payer = env.context.payer.pubkey();
    send(
        &mut env.context,
        &[system_instruction::transfer(
            &payer,
            &player.pubkey(),
            (MAX_PLAYERS as u64 + 10) * ENTRANCE_FEE,
        )],
        &[],
    )
    .await
    .unwrap();

    // the same player may hold several entries
    let entry = raffle_instruction::enter_raffle(&raffle::id(), &player.pubkey(), &env.raffle.pubkey(), ENTRANCE_FEE);
    for batch in vec![entry; MAX_PLAYERS].chunks(16) {
        send(&mut env.context, batch, &[&player]).await.unwrap();
    }
    assert_eq!(
        raffle_state(&mut env.context, &env.raffle.pubkey()).await.num_players(),
        MAX_PLAYERS
    );

    assert_eq!(
        enter(&mut env, &player, ENTRANCE_FEE).await.unwrap_err(),
        custom(RaffleError::RaffleFull as u32)
    );
}

#[tokio::test]
async fn test_fulfill_requires_subscription_balance() {
    let payment = BASE_FEE + GAS_PRICE_LINK * CALLBACK_GAS_LIMIT as u64;
    let mut env = setup_with_funding(payment - 1).await;
    let player = funded_player(&mut env.context).await;
    enter(&mut env, &player, ENTRANCE_FEE).await.unwrap();
    advance_past_interval(&mut env.context).await;
    let request_id = perform_upkeep(&mut env).await.unwrap();

    let payer = env.context.payer.pubkey();
    let fulfill = vrf_instruction::fulfill_random_words(
        &vrf_coordinator_mock::id(),
        &payer,
        request_id,
        env.subscription_id,
        &raffle::id(),
        &env.raffle.pubkey(),
        &[player.pubkey()],
    );
    assert_eq!(
        send(&mut env.context, &[fulfill.clone()], &[]).await.unwrap_err(),
        custom(VrfError::InsufficientBalance as u32)
    );
    assert_eq!(
        raffle_state(&mut env.context, &env.raffle.pubkey()).await.state,
        RaffleState::Calculating
    );

    let top_up = vrf_instruction::fund_subscription(&vrf_coordinator_mock::id(), &payer, env.subscription_id, 1);
    send(&mut env.context, &[top_up], &[]).await.unwrap();
    send(&mut env.context, &[fulfill], &[]).await.unwrap();

    let (subscription, _) = find_subscription_address(&vrf_coordinator_mock::id(), env.subscription_id);
    let account = env.context.banks_client.get_account(subscription).await.unwrap().unwrap();
    assert_eq!(Subscription::unpack(&account.data).unwrap().balance, 0);
    assert_eq!(
        raffle_state(&mut env.context, &env.raffle.pubkey()).await.recent_winner,
        player.pubkey()
    );
}
